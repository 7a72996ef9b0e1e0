use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required Address")]
    RequiredAddress,
    #[error("Required Password")]
    RequiredPassword,
    #[error("Required Email")]
    RequiredEmail,
    #[error("Invalid Email")]
    InvalidEmail,
}

type Rule = (fn(&User) -> bool, ValidationError);

const WRITE_RULES: &[Rule] = &[
    (has_address, ValidationError::RequiredAddress),
    (has_password, ValidationError::RequiredPassword),
    (has_email, ValidationError::RequiredEmail),
    (email_well_formed, ValidationError::InvalidEmail),
];

const LOGIN_RULES: &[Rule] = &[
    (has_password, ValidationError::RequiredPassword),
    (has_email, ValidationError::RequiredEmail),
    (email_well_formed, ValidationError::InvalidEmail),
];

impl Action {
    fn rules(self) -> &'static [Rule] {
        match self {
            Action::Create | Action::Update => WRITE_RULES,
            Action::Login => LOGIN_RULES,
        }
    }
}

impl User {
    /// Returns the first rule `action` requires that this user breaks.
    pub fn validate(&self, action: Action) -> Result<(), ValidationError> {
        match action.rules().iter().find(|(holds, _)| !holds(self)) {
            Some((_, err)) => Err(*err),
            None => Ok(()),
        }
    }
}

fn has_address(u: &User) -> bool {
    !u.address.is_empty()
}

fn has_password(u: &User) -> bool {
    !u.password.is_empty()
}

fn has_email(u: &User) -> bool {
    !u.email.is_empty()
}

fn email_well_formed(u: &User) -> bool {
    is_valid_email(&u.email)
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

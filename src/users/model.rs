use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User entity. `id == 0` means the store has not assigned one yet.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub address: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String, // plaintext until the repository stores it, hash afterwards
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Request body for create, update and login. Missing fields decode as empty
/// strings so the validator reports them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserPayload {
    pub address: String,
    pub email: String,
    pub password: String,
}

impl From<UserPayload> for User {
    fn from(p: UserPayload) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: 0,
            address: p.address,
            email: p.email,
            password: p.password,
            created_at: now,
            updated_at: now,
        }
    }
}

impl User {
    /// Trims and escapes the text fields, clears the id and restamps both
    /// timestamps.
    pub fn normalize(&mut self) {
        self.id = 0;
        self.address = escape_html(self.address.trim());
        self.email = escape_html(self.email.trim());
        let now = OffsetDateTime::now_utc();
        self.created_at = now;
        self.updated_at = now;
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}

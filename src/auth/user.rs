use serde::{Deserialize, Serialize};

/// The identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub username: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            name: user.name,
            username: user.username,
        }
    }
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
}

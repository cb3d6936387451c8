use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, TokenData, Validation};
use log::debug;
use rocket::{
    http::{Cookie, Status},
    request::{FromRequest, Outcome},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// A permission level that a route can demand of its caller.
pub trait Scope {
    /// Scopes the token must carry, all of them.
    const REQUIRED: &'static [&'static str];
}

/// Any member of the book club.
pub struct Member;

impl Scope for Member {
    const REQUIRED: &'static [&'static str] = &["bookclub"];
}

/// A book club member who may open, complete and delete polls.
pub struct Admin;

impl Scope for Admin {
    const REQUIRED: &'static [&'static str] = &["bookclub", "admin"];
}

/// An authenticated caller, as vouched for by the identity provider's JWT.
///
/// Tokens are issued elsewhere; we only verify them.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AuthToken<S> {
    /// The user identifier recorded against ballots.
    #[serde(rename = "sub")]
    pub username: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(skip)]
    phantom: PhantomData<S>,
}

impl<S> AuthToken<S> {
    /// Does this token carry the given scope?
    pub fn permits(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<S>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<S> {
    #[serde(flatten, bound = "")]
    token: AuthToken<S>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, S> FromRequest<'r> for AuthToken<S>
where
    S: Scope + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and check it carries every scope `S` requires.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::Status(
                        Status::InternalServerError,
                        "Application config is not loaded".to_string(),
                    ),
                ))
            }
        };

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Status(Status::Unauthorized, "Not authenticated".to_string()),
                ))
            }
        };

        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected auth token: {e}");
                return Outcome::Failure((Status::Unauthorized, e));
            }
        };

        if let Some(missing) = S::REQUIRED.iter().find(|scope| !token.permits(scope)) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Status(
                    Status::Forbidden,
                    format!("User '{}' lacks the '{}' scope", token.username, missing),
                ),
            ));
        }

        Outcome::Success(token)
    }
}

use serde::Deserialize;

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Identity handed over by the external provider. The assertion itself is
/// validated by the provider, not here.
#[derive(Debug, Deserialize)]
pub struct GoogleRequest {
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
}

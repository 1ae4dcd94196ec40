use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Raw signup form body. Every field is optional so validation can report
/// all problems at once instead of stopping at the first.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    pub fn validate(self) -> Result<SignUpForm, Vec<String>> {
        let mut problems = Vec::new();

        let name = present(self.name);
        if name.is_none() {
            problems.push("name is required".to_string());
        }

        let email = present(self.email).map(|v| v.to_lowercase());
        match &email {
            None => problems.push("email is required".to_string()),
            Some(v) if !is_valid_email(v) => problems.push("email is invalid".to_string()),
            _ => {}
        }

        let password = self.password.filter(|v| !v.is_empty());
        if password.is_none() {
            problems.push("password is required".to_string());
        }
        let confirm_password = self.confirm_password.filter(|v| !v.is_empty());
        if confirm_password.is_none() {
            problems.push("confirmPassword is required".to_string());
        }
        // Equality is checked client-side too, but only this check counts.
        if let (Some(p), Some(c)) = (&password, &confirm_password) {
            if p != c {
                problems.push("passwords do not match".to_string());
            }
        }

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) if problems.is_empty() => Ok(SignUpForm {
                name,
                email,
                password,
            }),
            _ => Err(problems),
        }
    }
}

/// GET /verify query string; the page only needs the pair echoed back.
#[derive(Debug, Deserialize)]
pub struct VerifyPageQuery {
    pub email: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub id: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug)]
pub struct VerifyForm {
    pub email: String,
    pub id: String,
    pub otp: String,
}

impl VerifyRequest {
    pub fn validate(self) -> Result<VerifyForm, Vec<String>> {
        let mut problems = Vec::new();

        let email = present(self.email).map(|v| v.to_lowercase());
        if email.is_none() {
            problems.push("email is required".to_string());
        }
        let id = present(self.id);
        if id.is_none() {
            problems.push("id is required".to_string());
        }
        let otp = present(self.otp);
        if otp.is_none() {
            problems.push("otp is required".to_string());
        }

        match (email, id, otp) {
            (Some(email), Some(id), Some(otp)) => Ok(VerifyForm { email, id, otp }),
            _ => Err(problems),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub redirect_to: Option<String>,
}

#[derive(Debug)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub redirect_to: String,
}

impl SignInRequest {
    pub fn validate(self) -> Result<SignInForm, Vec<String>> {
        let mut problems = Vec::new();

        let email = present(self.email).map(|v| v.to_lowercase());
        if email.is_none() {
            problems.push("email is required".to_string());
        }
        let password = self.password.filter(|v| !v.is_empty());
        if password.is_none() {
            problems.push("password is required".to_string());
        }

        match (email, password) {
            (Some(email), Some(password)) => Ok(SignInForm {
                email,
                password,
                redirect_to: local_target(self.redirect_to),
            }),
            _ => Err(problems),
        }
    }
}

/// Signed-in user as exposed to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Only same-site paths survive; anything else falls back to the root.
fn local_target(target: Option<String>) -> String {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") => t,
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_reports_every_missing_field() {
        let problems = SignUpRequest {
            name: None,
            email: None,
            password: None,
            confirm_password: None,
        }
        .validate()
        .expect_err("empty form must fail");
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("name")));
        assert!(problems.iter().any(|p| p.contains("confirmPassword")));
    }

    #[test]
    fn signup_rechecks_password_equality_server_side() {
        let problems = SignUpRequest {
            name: Some("Dana".into()),
            email: Some("dana@example.com".into()),
            password: Some("hunter22".into()),
            confirm_password: Some("hunter23".into()),
        }
        .validate()
        .expect_err("mismatch must fail");
        assert_eq!(problems, vec!["passwords do not match".to_string()]);
    }

    #[test]
    fn signup_rejects_bad_email_and_blank_name_together() {
        let problems = SignUpRequest {
            name: Some("   ".into()),
            email: Some("not-an-email".into()),
            password: Some("hunter22".into()),
            confirm_password: Some("hunter22".into()),
        }
        .validate()
        .expect_err("must fail");
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn signup_normalizes_email() {
        let form = SignUpRequest {
            name: Some("Dana".into()),
            email: Some("  Dana@Example.COM ".into()),
            password: Some("hunter22".into()),
            confirm_password: Some("hunter22".into()),
        }
        .validate()
        .expect("valid form");
        assert_eq!(form.email, "dana@example.com");
    }

    #[test]
    fn verify_requires_all_three_fields() {
        let problems = VerifyRequest {
            email: Some("dana@example.com".into()),
            id: None,
            otp: None,
        }
        .validate()
        .expect_err("must fail");
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn signin_defaults_to_root_redirect() {
        let form = SignInRequest {
            email: Some("dana@example.com".into()),
            password: Some("hunter22".into()),
            redirect_to: None,
        }
        .validate()
        .expect("valid form");
        assert_eq!(form.redirect_to, "/");
    }

    #[test]
    fn signin_rejects_offsite_redirects() {
        for target in ["https://evil.example", "//evil.example", "javascript:alert(1)"] {
            let form = SignInRequest {
                email: Some("dana@example.com".into()),
                password: Some("hunter22".into()),
                redirect_to: Some(target.into()),
            }
            .validate()
            .expect("valid form");
            assert_eq!(form.redirect_to, "/", "target {target} must not survive");
        }
    }

    #[test]
    fn signin_keeps_local_redirects() {
        let form = SignInRequest {
            email: Some("dana@example.com".into()),
            password: Some("hunter22".into()),
            redirect_to: Some("/projects/new".into()),
        }
        .validate()
        .expect("valid form");
        assert_eq!(form.redirect_to, "/projects/new");
    }
}

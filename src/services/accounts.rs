use crate::{
    auth::{self, AuthenticatedActor},
    config::AppConfig,
    error::{AppError, FieldError},
    models::{AuthPayload, LoginRequest, NewAccount, RegisterRequest, Role},
    repository::Repository,
};

const MIN_PASSWORD_LEN: usize = 8;
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Loose shape check: one `@`, a non-empty local part, and a dotted domain.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validated registration input, ready to be hashed and stored.
struct Registration {
    name: String,
    email: String,
    password: String,
    role: Role,
    company: Option<String>,
}

fn validate_registration(req: RegisterRequest) -> Result<Registration, AppError> {
    let mut errors = Vec::new();

    let name = req.name.trim().to_string();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }

    let email = normalize_email(&req.email);
    if !looks_like_email(&email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }

    if req.confirm_password.is_empty() {
        errors.push(FieldError::new(
            "confirmPassword",
            "Confirm password is required",
        ));
    } else if req.confirm_password != req.password {
        errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
    }

    let role = req.role.unwrap_or_default();
    if role == Role::Admin {
        errors.push(FieldError::new(
            "role",
            "Role must be either jobseeker or employer",
        ));
    }

    let company = req
        .company
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if role == Role::Employer && company.is_none() {
        errors.push(FieldError::new(
            "company",
            "Company name is required for employers",
        ));
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(Registration {
        name,
        email,
        password: req.password,
        role,
        company,
    })
}

/// register
///
/// Creates a jobseeker or employer account and signs the caller in. A duplicate email,
/// including a concurrent one, is a `Conflict`.
pub async fn register(
    repo: &dyn Repository,
    config: &AppConfig,
    req: RegisterRequest,
) -> Result<AuthPayload, AppError> {
    let registration = validate_registration(req)?;
    let password_hash = auth::hash_password(&registration.password)?;

    let account = repo
        .create_account(NewAccount {
            name: registration.name,
            email: registration.email,
            role: registration.role,
            company: registration.company,
            password_hash,
        })
        .await?;

    tracing::info!(account_id = %account.id, role = %account.role, "account registered");

    let token = auth::issue_token(account.id, account.role, config)?;
    Ok(AuthPayload {
        user: account,
        token,
    })
}

/// login
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(
    repo: &dyn Repository,
    config: &AppConfig,
    req: LoginRequest,
) -> Result<AuthPayload, AppError> {
    let email = normalize_email(&req.email);
    let mut errors = Vec::new();
    if !looks_like_email(&email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
    if req.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let Some((account, password_hash)) = repo.find_credentials(&email).await? else {
        tracing::debug!("login for unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !auth::verify_password(&req.password, &password_hash) {
        tracing::debug!(account_id = %account.id, "login with wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = auth::issue_token(account.id, account.role, config)?;
    Ok(AuthPayload {
        user: account,
        token,
    })
}

/// current_user
///
/// The actor's account with a freshly issued token.
pub async fn current_user(
    repo: &dyn Repository,
    config: &AppConfig,
    actor: &AuthenticatedActor,
) -> Result<AuthPayload, AppError> {
    let account = repo
        .find_account(actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let token = auth::issue_token(account.id, account.role, config)?;
    Ok(AuthPayload {
        user: account,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    fn jobseeker_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "  Grace Hopper ".to_string(),
            email: email.to_string(),
            password: "correct-horse".to_string(),
            confirm_password: "correct-horse".to_string(),
            role: None,
            company: None,
        }
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("a@b.io"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.io"));
        assert!(!looks_like_email("a b@c.io"));
        assert!(!looks_like_email("a@@b.io"));
    }

    #[test]
    fn registration_collects_all_violations() {
        let req = RegisterRequest {
            name: " ".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            confirm_password: "different".to_string(),
            role: Some(Role::Employer),
            company: None,
        };
        let Err(AppError::Validation(errors)) = validate_registration(req) else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["name", "email", "password", "confirmPassword", "company"]);
    }

    #[test]
    fn admin_cannot_self_register() {
        let mut req = jobseeker_request("root@example.com");
        req.role = Some(Role::Admin);
        assert!(matches!(validate_registration(req), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn register_normalizes_and_defaults_role() {
        let repo = MemoryRepository::new();
        let config = AppConfig::default();

        let payload = register(&repo, &config, jobseeker_request("  Grace@Example.COM "))
            .await
            .unwrap();
        assert_eq!(payload.user.email, "grace@example.com");
        assert_eq!(payload.user.name, "Grace Hopper");
        assert_eq!(payload.user.role, Role::Jobseeker);
        assert!(!payload.token.is_empty());

        let err = register(&repo, &config, jobseeker_request("grace@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "User with this email already exists"));
    }

    #[tokio::test]
    async fn login_failures_look_the_same() {
        let repo = MemoryRepository::new();
        let config = AppConfig::default();
        register(&repo, &config, jobseeker_request("grace@example.com"))
            .await
            .unwrap();

        let wrong_password = login(
            &repo,
            &config,
            LoginRequest {
                email: "grace@example.com".to_string(),
                password: "not-the-password".to_string(),
            },
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            &repo,
            &config,
            LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "correct-horse".to_string(),
            },
        )
        .await
        .unwrap_err();

        for err in [wrong_password, unknown_email] {
            assert!(matches!(err, AppError::Unauthorized(msg) if msg == INVALID_CREDENTIALS));
        }

        let ok = login(
            &repo,
            &config,
            LoginRequest {
                email: "GRACE@example.com".to_string(),
                password: "correct-horse".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.user.email, "grace@example.com");
    }
}

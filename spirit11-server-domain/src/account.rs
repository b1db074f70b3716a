use std::sync::Arc;

use log::{info, warn};
use rustrict::CensorStr;
use spirit11_core::{INITIAL_BUDGET, Money};
use validator::{Validate, ValidationError};

use crate::{
    ServiceError, ServiceResult, UserId,
    jwt::ArcJwtService,
    util::{validate, validation_error},
};

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub university: Option<String>,
    pub budget: Money,
    pub team_points: f64,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub university: Option<String>,
}

pub type ArcUserRepository = Arc<Box<dyn UserRepository + Send + Sync + 'static>>;

/// Budget and team points are written only through `RosterRepository::commit`.
#[async_trait::async_trait]
pub trait UserRepository {
    /// New users start at the initial budget with zero team points.
    async fn create_user(&self, user: &NewUser) -> ServiceResult<UserId>;
    async fn get_user(&self, id: UserId) -> ServiceResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> ServiceResult<Option<User>>;
    /// All users ordered by id.
    async fn get_users(&self) -> ServiceResult<Vec<User>>;
}

#[derive(Clone, Debug, Validate)]
pub struct Credentials {
    #[validate(length(min = 8, message = "Username must be at least 8 characters long"))]
    pub username: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c));
    if has_lower && has_upper && has_special {
        Ok(())
    } else {
        Err(validation_error(
            "password_strength",
            "Password must contain at least one lowercase letter, one uppercase letter, and one special character",
        ))
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}

pub type ArcAccountService = Arc<Box<dyn AccountService + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait AccountService {
    async fn signup(
        &self,
        credentials: Credentials,
        university: Option<String>,
    ) -> ServiceResult<Session>;
    async fn login(&self, username: &str, password: &str) -> ServiceResult<Session>;
    async fn create_admin(&self, credentials: Credentials, secret_key: &str)
    -> ServiceResult<User>;
    async fn get_user(&self, id: UserId) -> ServiceResult<User>;
    async fn authenticate(&self, token: &str) -> ServiceResult<User>;
}

pub struct AccountServiceImpl {
    user_repository: ArcUserRepository,
    jwt_service: ArcJwtService,
    admin_secret: Option<String>,
    hash_cost: u32,
}

impl AccountServiceImpl {
    pub fn new(
        user_repository: ArcUserRepository,
        jwt_service: ArcJwtService,
        admin_secret: Option<String>,
    ) -> Self {
        Self {
            user_repository,
            jwt_service,
            admin_secret,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, hash_cost: u32) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    fn validate_credentials(credentials: &Credentials) -> ServiceResult<()> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return ServiceError::bad_request("Username and password are required");
        }
        validate(credentials, "credentials")?;
        if credentials.username.is_inappropriate() {
            return ServiceError::bad_request("Username contains inappropriate content");
        }
        Ok(())
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
        is_admin: bool,
        university: Option<String>,
    ) -> ServiceResult<User> {
        Self::validate_credentials(credentials)?;
        if self
            .user_repository
            .get_user_by_username(&credentials.username)
            .await?
            .is_some()
        {
            return ServiceError::not_possible("Username already exists");
        }
        let password_hash = bcrypt::hash(&credentials.password, self.hash_cost)
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;
        let id = self
            .user_repository
            .create_user(&NewUser {
                username: credentials.username.clone(),
                password_hash,
                is_admin,
                university: university.filter(|u| !u.trim().is_empty()),
            })
            .await?;
        self.get_user(id).await
    }

    fn open_session(&self, user: User) -> ServiceResult<Session> {
        let access_token = self.jwt_service.generate_jwt(user.id)?;
        Ok(Session { user, access_token })
    }
}

#[async_trait::async_trait]
impl AccountService for AccountServiceImpl {
    async fn signup(
        &self,
        credentials: Credentials,
        university: Option<String>,
    ) -> ServiceResult<Session> {
        let user = self.create_account(&credentials, false, university).await?;
        info!("User {} signed up with id {}", user.username, user.id);
        self.open_session(user)
    }

    async fn login(&self, username: &str, password: &str) -> ServiceResult<Session> {
        if username.trim().is_empty() || password.is_empty() {
            return ServiceError::bad_request("Username and password are required");
        }
        let Some(user) = self.user_repository.get_user_by_username(username).await? else {
            return ServiceError::unauthorized("Invalid username or password");
        };
        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| ServiceError::Internal(format!("Failed to verify password: {}", e)))?;
        if !valid {
            return ServiceError::unauthorized("Invalid username or password");
        }
        self.open_session(user)
    }

    async fn create_admin(
        &self,
        credentials: Credentials,
        secret_key: &str,
    ) -> ServiceResult<User> {
        match &self.admin_secret {
            Some(secret) if !secret.is_empty() && secret == secret_key => {}
            _ => {
                warn!(
                    "Rejected admin creation for {}: invalid secret key",
                    credentials.username
                );
                return ServiceError::forbidden("Invalid secret key");
            }
        }
        let user = self.create_account(&credentials, true, None).await?;
        info!("Admin {} created with id {}", user.username, user.id);
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> ServiceResult<User> {
        match self.user_repository.get_user(id).await? {
            Some(user) => Ok(user),
            None => ServiceError::not_found("User not found"),
        }
    }

    async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let user_id = self.jwt_service.validate_jwt(token)?;
        self.get_user(user_id).await
    }
}

pub fn initial_user(id: UserId, user: &NewUser) -> User {
    User {
        id,
        username: user.username.clone(),
        password_hash: user.password_hash.clone(),
        is_admin: user.is_admin,
        university: user.university.clone(),
        budget: INITIAL_BUDGET,
        team_points: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use crate::{jwt::MockJwtService, memory::InMemoryStore};

    use super::*;

    fn account_service(admin_secret: Option<&str>) -> AccountServiceImpl {
        let store = InMemoryStore::new();
        AccountServiceImpl::new(
            Arc::new(Box::new(store)),
            Arc::new(Box::new(MockJwtService)),
            admin_secret.map(String::from),
        )
        .with_hash_cost(4) // bcrypt::MIN_COST (private in bcrypt 0.17)
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let service = account_service(None);
        let session = service
            .signup(
                credentials("spiritx_2025", "SpiritX@2025"),
                Some("University of Moratuwa".into()),
            )
            .await
            .unwrap();
        assert_eq!(session.user.budget, INITIAL_BUDGET);
        assert_eq!(session.user.team_points, 0.0);
        assert!(!session.user.is_admin);
        assert_eq!(session.access_token, format!("token-{}", session.user.id));

        let login = service.login("spiritx_2025", "SpiritX@2025").await.unwrap();
        assert_eq!(login.user.id, session.user.id);

        assert!(matches!(
            service.login("spiritx_2025", "wrong").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            service.login("nobody_here", "SpiritX@2025").await,
            Err(ServiceError::Unauthorized(_))
        ));

        let user = service.authenticate(&login.access_token).await.unwrap();
        assert_eq!(user.username, "spiritx_2025");
        assert!(matches!(
            service.authenticate("token-999").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let service = account_service(None);
        assert!(matches!(
            service.signup(credentials("short", "SpiritX@2025"), None).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            service
                .signup(credentials("longenough", "alllowercase1"), None)
                .await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            service.signup(credentials("", ""), None).await,
            Err(ServiceError::BadRequest(_))
        ));

        service
            .signup(credentials("longenough", "Valid#Pass"), None)
            .await
            .unwrap();
        assert!(matches!(
            service
                .signup(credentials("longenough", "Valid#Pass"), None)
                .await,
            Err(ServiceError::NotPossible(_))
        ));
    }

    #[tokio::test]
    async fn test_create_admin_requires_secret() {
        let service = account_service(Some("s3cret"));
        assert!(matches!(
            service
                .create_admin(credentials("admin_user", "Admin@Pass"), "wrong")
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        let admin = service
            .create_admin(credentials("admin_user", "Admin@Pass"), "s3cret")
            .await
            .unwrap();
        assert!(admin.is_admin);

        let disabled = account_service(None);
        assert!(matches!(
            disabled
                .create_admin(credentials("admin_user", "Admin@Pass"), "")
                .await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}

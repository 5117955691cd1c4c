use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::contract::model::{Caller, Role, User, UserProfile};
use crate::domain::error::DomainError;
use crate::domain::repo::UsersRepository;

#[derive(Clone)]
pub struct AccountsService {
    users: Arc<dyn UsersRepository>,
}

impl AccountsService {
    pub fn new(users: Arc<dyn UsersRepository>) -> Self {
        Self { users }
    }

    /// Find-or-create keyed by the caller's subject id. New users start as buyers.
    #[instrument(
        name = "storefront.accounts.sync_user",
        skip(self, caller, profile),
        fields(user_id = %caller.user_id)
    )]
    pub async fn sync_user(&self, caller: &Caller, profile: UserProfile) -> Result<User, DomainError> {
        let email = profile.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::invalid_email(email));
        }
        let name = profile
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let now = Utc::now();
        let user = self
            .users
            .upsert(User {
                id: caller.user_id.clone(),
                email: email.to_string(),
                name,
                role: Role::Buyer,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(role = user.role.as_str(), "Synced user");
        Ok(user)
    }

    #[instrument(
        name = "storefront.accounts.get_me",
        skip(self, caller),
        fields(user_id = %caller.user_id)
    )]
    pub async fn get_me(&self, caller: &Caller) -> Result<User, DomainError> {
        require_user(self.users.as_ref(), &caller.user_id).await
    }
}

/// Load a user that other writes will reference, or `UserNotFound`.
pub(crate) async fn require_user(
    users: &dyn UsersRepository,
    id: &str,
) -> Result<User, DomainError> {
    match users.find_by_id(id).await? {
        Some(user) => Ok(user),
        None => {
            debug!(user_id = id, "Caller has no user record");
            Err(DomainError::user_not_found(id))
        }
    }
}

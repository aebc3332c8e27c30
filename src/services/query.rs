use {
    crate::{
        domain::{
            error::PipelineError,
            subscription::Subscription,
            user::{Email, User},
        },
        infra::sqlite::{
            subscription_repo::list_subscriptions_for_user, user_repo::find_user_by_email,
        },
    },
    serde::Serialize,
    sqlx::SqlitePool,
};

#[derive(Debug, Serialize)]
pub struct UserOverview {
    pub user: Option<User>,
    /// Newest first.
    pub subscriptions: Vec<Subscription>,
}

/// Read-only lookup. An unknown email is not an error.
pub async fn user_with_subscriptions(
    pool: &SqlitePool,
    email: Option<&str>,
) -> Result<UserOverview, PipelineError> {
    let email = Email::parse_optional(email)?
        .ok_or_else(|| PipelineError::InvalidRequest("email is required".into()))?;

    let Some(user) = find_user_by_email(pool, &email).await? else {
        return Ok(UserOverview {
            user: None,
            subscriptions: Vec::new(),
        });
    };

    let subscriptions = list_subscriptions_for_user(pool, user.id).await?;
    Ok(UserOverview {
        user: Some(user),
        subscriptions,
    })
}

use {
    super::map_unique,
    crate::domain::{
        error::PipelineError,
        user::{Email, User},
    },
    chrono::{DateTime, Utc},
    sqlx::SqlitePool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

pub async fn find_user_by_email(
    pool: &SqlitePool,
    email: &Email,
) -> Result<Option<User>, PipelineError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT id, email, created_at FROM users WHERE email = ?")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

pub async fn find_user_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, PipelineError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT id, email, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

/// `DuplicateKey` if the email is taken.
pub async fn create_user(pool: &SqlitePool, email: &Email) -> Result<User, PipelineError> {
    let user = User {
        id: Uuid::now_v7(),
        email: email.as_str().to_string(),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)")
        .bind(user.id)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(pool)
        .await
        .map_err(|e| map_unique(e, || format!("user {email}")))?;

    Ok(user)
}

/// Two concurrent first purchases for the same email both end up with the
/// same row: the loser of the insert race re-reads.
pub async fn get_or_create_user(pool: &SqlitePool, email: &Email) -> Result<User, PipelineError> {
    if let Some(user) = find_user_by_email(pool, email).await? {
        return Ok(user);
    }

    match create_user(pool, email).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user created");
            Ok(user)
        }
        Err(PipelineError::DuplicateKey(_)) => find_user_by_email(pool, email)
            .await?
            .ok_or_else(|| PipelineError::UnknownReference(format!("user {email}"))),
        Err(e) => Err(e),
    }
}

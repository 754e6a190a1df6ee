use async_trait::async_trait;
use atelier_core::identity::{IdentityError, Role, User, UserRepository};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

fn user_from_row(row: UserRow) -> Result<User, IdentityError> {
    let role = Role::parse(&row.role)
        .ok_or_else(|| IdentityError::Storage(format!("unknown role {}", row.role)))?;
    Ok(User {
        id: row.id,
        email: row.email,
        name: row.name,
        password_hash: row.password_hash,
        role,
        created_at: row.created_at,
    })
}

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> Result<(), IdentityError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => IdentityError::EmailTaken(user.email.clone()),
            _ => IdentityError::Storage(e.to_string()),
        })?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
        row.map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, IdentityError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
        row.map(user_from_row).transpose()
    }
}

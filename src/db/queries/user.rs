use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::config::SuperUserSeed;
use crate::db::models::user::{LoginRecord, Profile, Role, SessionView, SignupRequest, UserRole};
use crate::error::{PortalError, PortalResult};

const PROFILE_COLUMNS: &str =
    "p.id, p.email, p.full_name, p.room_number, p.hostel_block, p.sap_id, p.created_at";

pub async fn fetch_login_record(pool: &PgPool, email: &str) -> PortalResult<Option<LoginRecord>> {
    let record = sqlx::query_as::<_, LoginRecord>(&format!(
        r#"
        SELECT {PROFILE_COLUMNS}, p.password_hash, r.role, r.approved
        FROM profiles p
        JOIN user_roles r ON r.user_id = p.id
        WHERE p.email = $1
        "#
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

pub async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> PortalResult<Profile> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(PortalError::NotFound("User"))
}

/// Profile and role are read together so a session never shows one without the other.
pub async fn fetch_session(pool: &PgPool, user_id: Uuid) -> PortalResult<SessionView> {
    let record = sqlx::query_as::<_, LoginRecord>(&format!(
        r#"
        SELECT {PROFILE_COLUMNS}, p.password_hash, r.role, r.approved
        FROM profiles p
        JOIN user_roles r ON r.user_id = p.id
        WHERE p.id = $1
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(PortalError::NotFound("User"))?;

    Ok(SessionView { user: record.profile(), role: record.role, is_approved: record.approved })
}

/// Creates the profile, its role row and, for roles that need it, the approval request.
pub async fn create_account(
    pool: &PgPool,
    payload: &SignupRequest,
    password_hash: &str,
) -> PortalResult<SessionView> {
    let mut tx = pool.begin().await?;

    let profile = insert_profile(&mut tx, payload, password_hash).await?;
    let approved = !payload.role.needs_approval();
    let role = insert_role(&mut tx, profile.id, payload.role, approved).await?;

    if payload.role.needs_approval() {
        sqlx::query(
            r#"
            INSERT INTO approval_requests (id, user_id, role, full_name, email)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile.id)
        .bind(payload.role)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(SessionView { user: profile, role: role.role, is_approved: role.approved })
}

async fn insert_profile(
    tx: &mut Transaction<'_, Postgres>,
    payload: &SignupRequest,
    password_hash: &str,
) -> PortalResult<Profile> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles
            (id, email, password_hash, full_name, room_number, hostel_block, sap_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, email, full_name, room_number, hostel_block, sap_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.email)
    .bind(password_hash)
    .bind(&payload.full_name)
    .bind(&payload.room_number)
    .bind(&payload.hostel_block)
    .bind(&payload.sap_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(profile)
}

async fn insert_role(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    role: Role,
    approved: bool,
) -> PortalResult<UserRole> {
    let row = sqlx::query_as::<_, UserRole>(
        r#"
        INSERT INTO user_roles (user_id, role, approved)
        VALUES ($1, $2, $3)
        RETURNING user_id, role, approved
        "#,
    )
    .bind(user_id)
    .bind(role)
    .bind(approved)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

pub async fn fetch_password_hash(pool: &PgPool, user_id: Uuid) -> PortalResult<String> {
    sqlx::query_scalar::<_, String>("SELECT password_hash FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(PortalError::NotFound("User"))
}

pub async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> PortalResult<()> {
    let result =
        sqlx::query("UPDATE profiles SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(PortalError::NotFound("User"));
    }
    Ok(())
}

/// Makes sure the configured super user exists. Existing accounts are left alone.
pub async fn ensure_super_user(pool: &PgPool, seed: &SuperUserSeed) -> PortalResult<()> {
    let email = seed.email.trim().to_lowercase();
    if fetch_login_record(pool, &email).await?.is_some() {
        return Ok(());
    }

    let password_hash = bcrypt::hash(&seed.password, bcrypt::DEFAULT_COST)?;
    let payload = SignupRequest {
        email: email.clone(),
        password: String::new(),
        full_name: seed.full_name.clone(),
        role: Role::SuperUser,
        room_number: None,
        hostel_block: None,
        sap_id: None,
    };

    let mut tx = pool.begin().await?;
    let profile = insert_profile(&mut tx, &payload, &password_hash).await?;
    insert_role(&mut tx, profile.id, Role::SuperUser, true).await?;
    tx.commit().await?;

    info!("✅ Super user account created for {}", email);
    Ok(())
}

use actix_web::{web, HttpResponse};
use log::{error, info};

use super::auth_models::{AuthData, LoginRequest, RegisterRequest, UpdateProfileRequest, UserData};
use crate::error::{ApiError, ApiResult};
use crate::models::user::NewUser;
use crate::response::Envelope;
use crate::session::{expired_session_cookie, issue_session, session_cookie, AuthUser};
use crate::state::AppState;

// bcrypt is CPU-bound; both helpers run on the blocking pool
async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    Ok(web::block(move || bcrypt::hash(password, cost)).await??)
}

async fn verify_password(password: String, password_hash: String) -> ApiResult<bool> {
    Ok(web::block(move || bcrypt::verify(password, &password_hash)).await??)
}

// register user to DB and open a session for them
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = request.into_inner().validate()?;
    info!("Received request to register user: {}", registration.username);

    if state
        .store
        .identity_taken(&registration.username, &registration.email, None)
        .await?
    {
        info!("Username or email already taken: {}", registration.username);
        return Err(ApiError::Conflict(
            "User with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(registration.password, state.config.bcrypt_cost).await?;
    let user = state
        .store
        .create_user(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
        })
        .await?;
    let session = issue_session(state.store.as_ref(), user.id, state.config.session_ttl).await?;

    info!("New user registered: {} ({})", user.username, user.email);
    Ok(HttpResponse::Created()
        .cookie(session_cookie(&session))
        .json(Envelope::with_message(
            "User registered successfully",
            AuthData {
                user,
                token: session.session_id,
            },
        )))
}

// login logic
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = request.into_inner().validate()?;
    info!("Received login request for: {}", credentials.email);

    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    let Some(user) = state.store.find_user_by_email(&credentials.email).await? else {
        info!("Unknown email: {}", credentials.email);
        return Err(invalid());
    };

    let valid = match verify_password(credentials.password, user.password_hash.clone()).await {
        Ok(valid) => valid,
        Err(e) => {
            error!("Error when checking password for user {}: {}", user.username, e);
            false
        }
    };
    if !valid {
        info!("Invalid password for user: {}", user.username);
        return Err(invalid());
    }

    let session = issue_session(state.store.as_ref(), user.id, state.config.session_ttl).await?;
    info!("User logged in: {} ({})", user.username, user.email);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session))
        .json(Envelope::with_message(
            "Login successful",
            AuthData {
                user,
                token: session.session_id,
            },
        )))
}

pub async fn get_profile(auth: AuthUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(Envelope::data(UserData { user: auth.user })))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    request: web::Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    let update = request.into_inner().validate()?;
    let user_id = auth.id();

    if state
        .store
        .identity_taken(&update.username, &update.email, Some(user_id))
        .await?
    {
        return Err(ApiError::Conflict("Username or email already exists".into()));
    }

    state
        .store
        .update_user(user_id, &update.username, &update.email)
        .await?;
    if let Some(password) = update.password {
        let password_hash = hash_password(password, state.config.bcrypt_cost).await?;
        state.store.update_password(user_id, &password_hash).await?;
    }

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!("User profile updated: {} ({})", user.username, user.email);
    Ok(HttpResponse::Ok().json(Envelope::with_message(
        "Profile updated successfully",
        UserData { user },
    )))
}

pub async fn logout(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    state.store.delete_session(&auth.session_id).await?;
    info!("Logout successful for user: {}", auth.user.username);
    Ok(HttpResponse::Ok()
        .cookie(expired_session_cookie())
        .json(Envelope::message("Logout successful")))
}

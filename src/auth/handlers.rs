use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{PublicUser, SignInRequest, SignUpRequest, VerifyPageQuery, VerifyRequest},
        otp,
        password::{hash_secret, verify_secret},
        repo::{is_unique_violation, TempUser, User},
        session::{self, AuthRedirect, AuthUser, SessionKeys},
    },
    email::send_otp_email,
    error::ApiError,
    state::AppState,
};

// One message for unknown email and wrong password: nothing in the response
// may reveal whether an account exists.
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_VERIFICATION_LINK: &str = "Invalid verification link";
const INVALID_VERIFICATION_CODE: &str = "Invalid verification code";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/signup", post(signup))
        .route("/verify", get(verify_page).post(verify))
        .route("/signin", get(signin_page).post(signin))
        .route("/logout", post(logout))
}

#[instrument(skip(state))]
async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthRedirect> {
    // The extractor confirmed the user moments ago; a miss here is the same
    // dangling-session condition and gets the same treatment.
    let user = match User::find_by_id(&state.db, user_id).await {
        Ok(Some(u)) => u,
        _ => return Err(AuthRedirect::to_signin("/")),
    };
    Ok(Json(PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Form(payload): Form<SignUpRequest>,
) -> Result<Redirect, ApiError> {
    let form = payload.validate().map_err(ApiError::Validation)?;

    if User::find_by_email(&state.db, &form.email).await?.is_some() {
        warn!(email = %form.email, "signup for already registered email");
        return Err(ApiError::conflict("User already exists"));
    }

    let password_hash = hash_secret(&form.password)?;
    let code = otp::generate();
    let otp_hash = hash_secret(&code)?;

    // Most recent signup wins: any pending verification for this email is replaced.
    TempUser::delete_by_email(&state.db, &form.email).await?;
    let temp_user =
        match TempUser::create(&state.db, &form.name, &form.email, &password_hash, &otp_hash).await
        {
            Ok(t) => t,
            Err(e) if is_unique_violation(&e) => {
                warn!(email = %form.email, "lost race against concurrent signup");
                return Err(ApiError::conflict("User already exists"));
            }
            Err(e) => return Err(e.into()),
        };

    let verification_path = verification_path(&form.email, temp_user.id);
    let link = format!("{}{}", state.config.app_url, verification_path);
    send_otp_email(state.mailer.as_ref(), &form.email, &code, &link).await?;

    info!(temp_user_id = %temp_user.id, email = %form.email, "signup pending verification");
    Ok(Redirect::to(&verification_path))
}

fn verification_path(email: &str, id: Uuid) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("email", email)
        .append_pair("id", &id.to_string())
        .finish();
    format!("/verify?{query}")
}

#[instrument]
async fn verify_page(Query(query): Query<VerifyPageQuery>) -> impl IntoResponse {
    match (query.email, query.id) {
        (Some(email), Some(id)) => Json(json!({ "email": email, "id": id })).into_response(),
        _ => Redirect::to("/signup").into_response(),
    }
}

#[instrument(skip(state, payload))]
async fn verify(
    State(state): State<AppState>,
    Form(payload): Form<VerifyRequest>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let form = payload.validate().map_err(ApiError::Validation)?;

    // An unparsable id cannot reference a pending signup.
    let Ok(temp_user_id) = Uuid::parse_str(&form.id) else {
        return Err(ApiError::unauthorized(INVALID_VERIFICATION_LINK));
    };
    let Some(temp_user) = TempUser::find_by_id(&state.db, temp_user_id).await? else {
        warn!(%temp_user_id, "verification against unknown or superseded signup");
        return Err(ApiError::unauthorized(INVALID_VERIFICATION_LINK));
    };

    // Expired and mismatched codes are indistinguishable to the caller.
    let code_matches = verify_secret(&form.otp, &temp_user.otp_hash);
    let expired = OffsetDateTime::now_utc() - temp_user.created_at > otp::OTP_TTL;
    if expired || !code_matches {
        warn!(%temp_user_id, expired, "verification code rejected");
        return Err(ApiError::unauthorized(INVALID_VERIFICATION_CODE));
    }

    let user = match temp_user.promote(&state.db).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(%temp_user_id, "account already exists for verified email");
            return Err(ApiError::conflict("User already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "email verified, account created");
    Ok((CookieJar::new().add(cookie), Redirect::to("/")))
}

/// Already-authenticated visitors skip the sign-in page.
#[instrument(skip(state, jar))]
async fn signin_page(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let keys = SessionKeys::from_ref(&state);
    match keys.read(&jar) {
        Some(_) => Redirect::to("/").into_response(),
        None => StatusCode::OK.into_response(),
    }
}

#[instrument(skip(state, jar, payload))]
async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<SignInRequest>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let form = payload.validate().map_err(ApiError::Validation)?;

    let Some(user) = User::find_by_email(&state.db, &form.email).await? else {
        warn!(email = %form.email, "signin for unknown email");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };
    if !verify_secret(&form.password, &user.password_hash) {
        warn!(user_id = %user.id, "signin with invalid password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.issue(user.id)?;
    info!(user_id = %user.id, "user signed in");
    Ok((jar.add(cookie), Redirect::to(&form.redirect_to)))
}

#[instrument(skip(jar))]
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (session::destroy(jar), Redirect::to("/signin"))
}

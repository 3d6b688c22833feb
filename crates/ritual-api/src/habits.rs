use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use ritual_db::models::now;
use ritual_types::api::{Claims, HabitRequest};
use ritual_types::models::Habit;
use ritual_types::validate::validate;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub is_pleasant: Option<bool>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

fn default_limit() -> u32 {
    50
}

/// Normalize the payload, resolve the related-habit snapshot, and run the
/// full rule set. Create and update both come through here — the same
/// rules apply everywhere a habit's fields are set.
fn checked(state: &AppState, req: HabitRequest) -> Result<HabitRequest, ApiError> {
    let req = req.normalize();

    let related = match req.related_habit {
        Some(id) => state.db.get_habit(id)?,
        None => None,
    };

    let mut violations = validate(&req, related.as_ref());
    if req.related_habit.is_some() && related.is_none() {
        violations.push("related_habit", "related habit does not exist");
    }

    if violations.is_empty() {
        Ok(req)
    } else {
        Err(ApiError::Validation(violations))
    }
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HabitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = checked(&state, req)?;

    let created_at = now();
    let habit = Habit {
        id: Uuid::new_v4(),
        owner_id: claims.sub,
        place: req.place,
        time: req.time,
        action: req.action,
        is_pleasant: req.is_pleasant,
        related_habit: req.related_habit,
        periodicity: req.periodicity,
        reward: req.reward,
        duration: req.duration,
        is_public: req.is_public,
        created_at,
        updated_at: created_at,
    };

    state.db.insert_habit(&habit)?;

    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn list_habits(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let habits = state.db.habits_for_owner(
        claims.sub,
        page.is_pleasant,
        page.is_public,
        page.limit.min(200),
        page.offset,
    )?;
    Ok(Json(habits))
}

pub async fn public_habits(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let habits = state
        .db
        .public_habits(page.is_pleasant, page.limit.min(200), page.offset)?;
    Ok(Json(habits))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let habit = owned_habit(&state, id, &claims)?;
    Ok(Json(habit))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HabitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = owned_habit(&state, id, &claims)?;
    let req = checked(&state, req)?;

    let habit = Habit {
        id: existing.id,
        owner_id: existing.owner_id,
        place: req.place,
        time: req.time,
        action: req.action,
        is_pleasant: req.is_pleasant,
        related_habit: req.related_habit,
        periodicity: req.periodicity,
        reward: req.reward,
        duration: req.duration,
        is_public: req.is_public,
        created_at: existing.created_at,
        updated_at: now(),
    };

    if !state.db.update_habit(&habit)? {
        return Err(ApiError::NotFound);
    }

    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db.delete_habit(id, claims.sub)? {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch a habit, answering 404 both for unknown ids and for habits owned
/// by someone else — ownership is not leaked.
fn owned_habit(state: &AppState, id: Uuid, claims: &Claims) -> Result<Habit, ApiError> {
    let habit = state.db.get_habit(id)?.ok_or(ApiError::NotFound)?;
    if habit.owner_id != claims.sub {
        return Err(ApiError::NotFound);
    }
    Ok(habit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppStateInner;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    fn state() -> AppState {
        Arc::new(AppStateInner {
            db: Arc::new(ritual_db::Database::open_in_memory().unwrap()),
            jwt_secret: "test-secret".into(),
            bot_secret: "test-bot-secret".into(),
        })
    }

    fn claims(sub: Uuid) -> Claims {
        Claims {
            sub,
            username: "alice".into(),
            exp: 0,
        }
    }

    fn request(value: serde_json::Value) -> HabitRequest {
        serde_json::from_value(value).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_persists_and_answers_created() {
        let state = state();
        let owner = Uuid::new_v4();

        let result = create_habit(
            State(state.clone()),
            Extension(claims(owner)),
            Json(request(serde_json::json!({
                "place": "Park",
                "time": "09:00",
                "action": "run",
                "duration": 120,
                "reward": "coffee",
            }))),
        )
        .await;

        let response = result.map(IntoResponse::into_response).unwrap_or_else(|_| {
            panic!("create rejected a valid habit");
        });
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();

        let stored = state.db.get_habit(id).unwrap().unwrap();
        assert_eq!(stored.owner_id, owner);
        assert_eq!(stored.reward.as_deref(), Some("coffee"));
    }

    #[tokio::test]
    async fn create_rejects_with_field_keyed_errors() {
        let state = state();

        let result = create_habit(
            State(state),
            Extension(claims(Uuid::new_v4())),
            Json(request(serde_json::json!({
                "place": "Home",
                "time": "21:00",
                "action": "read",
                "is_pleasant": true,
                "reward": "cake",
                "duration": 121,
            }))),
        )
        .await;

        let Err(err) = result else {
            panic!("expected validation rejection");
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert!(body["errors"]["reward"].is_array());
        assert!(body["errors"]["duration"].is_array());
    }

    #[tokio::test]
    async fn create_rejects_unknown_related_habit() {
        let state = state();

        let result = create_habit(
            State(state),
            Extension(claims(Uuid::new_v4())),
            Json(request(serde_json::json!({
                "place": "Park",
                "time": "09:00",
                "action": "run",
                "duration": 60,
                "related_habit": Uuid::new_v4(),
            }))),
        )
        .await;

        let Err(ApiError::Validation(violations)) = result else {
            panic!("expected validation rejection");
        };
        assert_eq!(
            violations.field("related_habit"),
            Some(&["related habit does not exist".to_string()][..])
        );
    }

    #[tokio::test]
    async fn create_normalizes_blank_reward() {
        let state = state();
        let owner = Uuid::new_v4();

        // blank reward on a pleasant habit must not trip the reward rule
        let result = create_habit(
            State(state.clone()),
            Extension(claims(owner)),
            Json(request(serde_json::json!({
                "place": "Home",
                "time": "21:00",
                "action": "read",
                "is_pleasant": true,
                "reward": "   ",
                "duration": 30,
            }))),
        )
        .await;
        assert!(result.is_ok());

        let stored = state
            .db
            .habits_for_owner(owner, None, None, 50, 0)
            .unwrap()
            .remove(0);
        assert_eq!(stored.reward, None);
    }

    #[tokio::test]
    async fn update_runs_the_same_rules_and_bumps_updated_at() {
        let state = state();
        let owner = Uuid::new_v4();

        let created = create_habit(
            State(state.clone()),
            Extension(claims(owner)),
            Json(request(serde_json::json!({
                "place": "Park",
                "time": "09:00",
                "action": "run",
                "duration": 60,
            }))),
        )
        .await;
        assert!(created.is_ok());
        let habit = state
            .db
            .habits_for_owner(owner, None, None, 50, 0)
            .unwrap()
            .remove(0);

        let rejected = update_habit(
            State(state.clone()),
            Path(habit.id),
            Extension(claims(owner)),
            Json(request(serde_json::json!({
                "place": "Park",
                "time": "09:00",
                "action": "run",
                "duration": 0,
            }))),
        )
        .await;
        assert!(matches!(rejected, Err(ApiError::Validation(_))));

        let updated = update_habit(
            State(state.clone()),
            Path(habit.id),
            Extension(claims(owner)),
            Json(request(serde_json::json!({
                "place": "Track",
                "time": "09:30",
                "action": "sprint",
                "duration": 90,
            }))),
        )
        .await;
        assert!(updated.is_ok());

        let stored = state.db.get_habit(habit.id).unwrap().unwrap();
        assert_eq!(stored.place, "Track");
        assert_eq!(stored.created_at, habit.created_at);
        assert!(stored.updated_at >= habit.updated_at);
    }

    #[tokio::test]
    async fn other_users_habit_reads_as_not_found() {
        let state = state();
        let owner = Uuid::new_v4();

        assert!(
            create_habit(
                State(state.clone()),
                Extension(claims(owner)),
                Json(request(serde_json::json!({
                    "place": "Park",
                    "time": "09:00",
                    "action": "run",
                    "duration": 60,
                }))),
            )
            .await
            .is_ok()
        );
        let habit = state
            .db
            .habits_for_owner(owner, None, None, 50, 0)
            .unwrap()
            .remove(0);

        let stranger = claims(Uuid::new_v4());

        let fetched = get_habit(
            State(state.clone()),
            Path(habit.id),
            Extension(stranger.clone()),
        )
        .await;
        assert!(matches!(fetched, Err(ApiError::NotFound)));

        let deleted = delete_habit(State(state), Path(habit.id), Extension(stranger)).await;
        assert!(matches!(deleted, Err(ApiError::NotFound)));
    }
}

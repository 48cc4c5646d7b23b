use crate::{
    errors::{ApiError, ErrorMessages},
    graphql::RequestContext,
    models::{CreateTopicInput, Topic, TokenResponse, UserPreferences, UserPreferencesInput},
    services::{auth::issue_demo_token, Caller},
    state::Services,
    validation::{
        validate_input, validate_name, validate_preferences, validate_topic_fields,
        MAX_CATEGORY_LENGTH,
    },
};
use async_graphql::{Context, ErrorExtensions, Object};

const PREFERENCES_TTL_SECS: u64 = 30 * 24 * 60 * 60;

fn authenticated_caller(ctx: &Context<'_>) -> async_graphql::Result<Caller> {
    match ctx.data_opt::<RequestContext>() {
        Some(request) if !request.caller.is_demo() => Ok(request.caller.clone()),
        _ => Err(ApiError::Unauthorized(ErrorMessages::AuthRequired.to_string()).extend()),
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn generate_demo_token(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<TokenResponse> {
        let services = ctx.data::<Services>()?;
        issue_demo_token(&services.config.jwt_secret, chrono::Utc::now()).map_err(|e| e.extend())
    }

    async fn update_user_preferences(
        &self,
        ctx: &Context<'_>,
        input: UserPreferencesInput,
    ) -> async_graphql::Result<UserPreferences> {
        let caller = authenticated_caller(ctx)?;
        let services = ctx.data::<Services>()?;
        validate_preferences(input.theme.as_deref(), input.currency.as_deref())
            .map_err(|e| e.extend())?;
        let preferences = UserPreferences::from(input);

        services
            .cache
            .set_json(&format!("prefs:{}", caller.id), &preferences, PREFERENCES_TTL_SECS)
            .await
            .map_err(|e| e.extend())?;
        tracing::info!("Stored preferences for {}", caller.id);

        Ok(preferences)
    }

    async fn create_topic(
        &self,
        ctx: &Context<'_>,
        input: CreateTopicInput,
    ) -> async_graphql::Result<Topic> {
        authenticated_caller(ctx)?;
        validate_topic_fields(&input.topic, &input.category).map_err(|e| e.extend())?;

        let verdict = validate_name(&input.topic);
        if !verdict.valid_for_new_packages {
            let problem = verdict.first_problem().unwrap_or("invalid name");
            return Err(
                ApiError::Validation(format!("Invalid topic name: {problem}")).extend(),
            );
        }
        let category =
            validate_input(&input.category, MAX_CATEGORY_LENGTH).map_err(|e| e.extend())?;
        let description = input
            .description
            .map(|d| validate_input(&d, 1000))
            .transpose()
            .map_err(|e| e.extend())?;

        Ok(Topic {
            topic: input.topic,
            category,
            description,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

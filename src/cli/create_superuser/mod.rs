//! Create-superuser command

use clap::Args;
use tracing::info;

use crate::api::UserServiceTrait;
use crate::domain::ExtraFields;

#[derive(Debug, Args)]
pub struct CreateSuperuserArgs {
    /// Login email of the new account
    #[arg(long)]
    pub email: String,

    /// Initial password
    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,
}

/// Create the superuser in the configured store
pub async fn run(args: CreateSuperuserArgs) -> anyhow::Result<()> {
    let config = super::load_config();
    let state = crate::create_app_state_with_config(&config).await?;

    if config.database.url.is_none() {
        tracing::warn!("Creating a superuser in the in-memory store; it is lost on exit");
    }

    let user_id = create_superuser(state.user_service.as_ref(), &args).await?;

    info!(user_id = %user_id, "Superuser created");
    println!("Superuser created: {}", args.email);

    Ok(())
}

async fn create_superuser(
    service: &dyn UserServiceTrait,
    args: &CreateSuperuserArgs,
) -> anyhow::Result<String> {
    let extra = ExtraFields::with_names(
        args.first_name.clone().unwrap_or_default(),
        args.last_name.clone().unwrap_or_default(),
    );

    let user = service
        .create_superuser(&args.email, &args.password, extra)
        .await?;

    Ok(user.id().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;

    fn args(email: &str) -> CreateSuperuserArgs {
        CreateSuperuserArgs {
            email: email.to_string(),
            password: "foo_bar_baz".to_string(),
            first_name: Some("Super".to_string()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_superuser() {
        let app = TestApp::new();
        let service = app.state.user_service.as_ref();

        create_superuser(service, &args("super@django.com")).await.unwrap();

        let user = service.get_by_email("super@django.com").await.unwrap().unwrap();
        assert!(user.is_active());
        assert!(user.is_staff());
        assert!(user.is_superuser());
        assert_eq!(user.first_name(), "Super");
    }

    #[tokio::test]
    async fn test_create_superuser_duplicate_fails() {
        let app = TestApp::new();
        let service = app.state.user_service.as_ref();

        create_superuser(service, &args("super@django.com")).await.unwrap();
        assert!(create_superuser(service, &args("super@django.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_create_superuser_requires_email() {
        let app = TestApp::new();

        let err = create_superuser(app.state.user_service.as_ref(), &args(""))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Email must be entered to create a user"));
    }
}

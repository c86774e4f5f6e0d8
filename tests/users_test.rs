mod common;

use anyhow::Result;
use common::{create_user, test_service};
use walletbook::application::AppError;
use walletbook::domain::UserDraft;

#[tokio::test]
async fn test_create_and_get_user() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let created = create_user(&service, "ada").await?;
    assert_eq!(created.status, "active");
    assert_eq!(created.created_at, created.modified_at);

    let fetched = service.get_user(&created.id.to_string()).await?;
    assert_eq!(fetched, created);

    Ok(())
}

#[tokio::test]
async fn test_create_user_requires_every_field() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .create_user(UserDraft {
            firstname: Some("Ada".into()),
            lastname: Some("Lovelace".into()),
            username: Some("ada".into()),
            email: Some("   ".into()),
        })
        .await;

    assert!(matches!(result, Err(AppError::MissingField("email"))));
    Ok(())
}

#[tokio::test]
async fn test_get_unknown_user() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let unknown = service
        .get_user("00000000-0000-4000-8000-000000000000")
        .await;
    assert!(matches!(unknown, Err(AppError::UserNotFound(_))));

    let malformed = service.get_user("not-a-uuid").await;
    assert!(matches!(malformed, Err(AppError::UserNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_update_user_status() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = create_user(&service, "grace").await?;

    let updated = service
        .update_user_status(&user.id.to_string(), Some("suspended".into()))
        .await?;
    assert_eq!(updated.status, "suspended");
    assert_eq!(updated.created_at, user.created_at);
    assert!(updated.modified_at >= user.modified_at);

    let fetched = service.get_user(&user.id.to_string()).await?;
    assert_eq!(fetched.status, "suspended");

    let missing = service.update_user_status(&user.id.to_string(), None).await;
    assert!(matches!(missing, Err(AppError::MissingField("status"))));

    Ok(())
}

#[tokio::test]
async fn test_update_status_of_unknown_user() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = create_user(&service, "ada").await?;

    let unknown = service
        .update_user_status(
            "00000000-0000-4000-8000-000000000000",
            Some("suspended".into()),
        )
        .await;
    assert!(matches!(unknown, Err(AppError::UserNotFound(_))));

    let malformed = service
        .update_user_status("not-a-uuid", Some("suspended".into()))
        .await;
    assert!(matches!(malformed, Err(AppError::UserNotFound(_))));

    // Other users are left alone
    let fetched = service.get_user(&user.id.to_string()).await?;
    assert_eq!(fetched.status, "active");

    Ok(())
}

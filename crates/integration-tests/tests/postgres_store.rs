//! `PgStore` against a live database.
//!
//! These tests require a running `PostgreSQL` reachable through
//! `LARDER_TEST_DATABASE_URL`.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};

use larder_api::db::{
    HouseholdRepository, InvitationRepository, PantryItemRepository, RepositoryError,
    ShoppingListRepository, UserDirectory,
};
use larder_api::models::{NewInvitation, NewPantryItem};
use larder_core::{Email, HouseholdRole, InvitationStatus, UserId};
use larder_integration_tests::{sign_up, store, unique_email};

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_household_created_with_owner() {
    let store = store().await;
    let owner = UserId::generate();

    let (household, membership) = store
        .create_household_with_owner("Smiths", owner)
        .await
        .unwrap();
    assert_eq!(membership.role, HouseholdRole::Owner);
    assert_eq!(membership.household_id, household.id);

    let members = store.list_members(household.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].role.is_owner());
    assert_eq!(store.households_for_user(owner).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_duplicate_membership_conflicts() {
    let store = store().await;
    let (household, _) = store
        .create_household_with_owner("Smiths", UserId::generate())
        .await
        .unwrap();
    let member = UserId::generate();

    store
        .add_member(household.id, member, HouseholdRole::Member)
        .await
        .unwrap();
    let err = store
        .add_member(household.id, member, HouseholdRole::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_concurrent_owner_removal_keeps_one_owner() {
    let store = store().await;
    let alice = UserId::generate();
    let bob = UserId::generate();
    let (household, _) = store
        .create_household_with_owner("Smiths", alice)
        .await
        .unwrap();
    store
        .add_member(household.id, bob, HouseholdRole::Owner)
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        store.remove_member(household.id, bob),
        store.remove_member(household.id, alice),
    );
    let removed = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Ok(true)))
        .count();
    assert_eq!(removed, 1);
    assert!([first, second]
        .into_iter()
        .any(|r| matches!(r, Err(RepositoryError::Conflict(_)))));

    let members = store.list_members(household.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].role.is_owner());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_find_user_by_email_ignores_case() {
    let store = store().await;
    let address = unique_email("Carol");
    let id = UserId::generate();
    // Stored as the identity provider sent it, not normalized.
    sqlx::query("INSERT INTO profiles (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(&address)
        .execute(store.pool())
        .await
        .unwrap();

    let found = store
        .find_user_by_email(&Email::parse(&address).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, id);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_unknown_email_has_no_account() {
    let store = store().await;
    sign_up(store.pool(), &unique_email("dave")).await;

    let found = store
        .find_user_by_email(&Email::parse(&unique_email("erin")).unwrap())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_invitation_transitions_once() {
    let store = store().await;
    let owner = UserId::generate();
    let (household, _) = store
        .create_household_with_owner("Smiths", owner)
        .await
        .unwrap();
    let invitation = store
        .create_invitation(&NewInvitation {
            household_id: household.id,
            email: Email::parse(&unique_email("b")).unwrap(),
            role: HouseholdRole::Member,
            invited_by: owner,
            expires_at: Utc::now() + Duration::days(7),
        })
        .await
        .unwrap();
    assert_eq!(invitation.status, InvitationStatus::Pending);

    assert!(store
        .transition_invitation(invitation.id, InvitationStatus::Accepted)
        .await
        .unwrap());
    assert!(!store
        .transition_invitation(invitation.id, InvitationStatus::Declined)
        .await
        .unwrap());

    let stored = store.get_invitation(invitation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_one_pending_invitation_per_email() {
    let store = store().await;
    let owner = UserId::generate();
    let (household, _) = store
        .create_household_with_owner("Smiths", owner)
        .await
        .unwrap();
    let new = NewInvitation {
        household_id: household.id,
        email: Email::parse(&unique_email("b")).unwrap(),
        role: HouseholdRole::Member,
        invited_by: owner,
        expires_at: Utc::now() + Duration::days(7),
    };

    let first = store.create_invitation(&new).await.unwrap();
    let err = store.create_invitation(&new).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let later = NewInvitation {
        expires_at: Utc::now() + Duration::days(14),
        ..new.clone()
    };
    let refreshed = store
        .refresh_invitation(first.id, &later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.id, first.id);
    assert!(refreshed.expires_at > first.expires_at);
    assert!(refreshed.email_sent_at.is_none());

    let found = store
        .find_pending_invitation(household.id, &new.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_prune_only_removes_expired_pending() {
    let store = store().await;
    let owner = UserId::generate();
    let (household, _) = store
        .create_household_with_owner("Smiths", owner)
        .await
        .unwrap();
    let stale = store
        .create_invitation(&NewInvitation {
            household_id: household.id,
            email: Email::parse(&unique_email("stale")).unwrap(),
            role: HouseholdRole::Member,
            invited_by: owner,
            expires_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();
    let fresh = store
        .create_invitation(&NewInvitation {
            household_id: household.id,
            email: Email::parse(&unique_email("fresh")).unwrap(),
            role: HouseholdRole::Member,
            invited_by: owner,
            expires_at: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();

    store.delete_expired_invitations(Utc::now()).await.unwrap();
    assert!(store.get_invitation(stale.id).await.unwrap().is_none());
    assert!(store.get_invitation(fresh.id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_item_round_trip_and_cascade() {
    let store = store().await;
    let owner = UserId::generate();
    let (household, _) = store
        .create_household_with_owner("Smiths", owner)
        .await
        .unwrap();

    let new = NewPantryItem {
        tags: vec!["dairy".to_string()],
        location: Some("Fridge".to_string()),
        ..NewPantryItem::named("Milk")
    };
    let mut item = store.create_item(household.id, owner, &new).await.unwrap();
    assert_eq!(item.tags, vec!["dairy".to_string()]);
    assert_eq!(item.completion, Some(100));

    item.completion = Some(0);
    let updated = store.update_item(&item).await.unwrap().unwrap();
    assert_eq!(updated.completion, Some(0));

    let entry = store.add_entry(item.id, owner).await.unwrap();
    let err = store.add_entry(item.id, owner).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(msg) if msg == "already in list"));

    let listed = store.list_for_user(owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].item.name, "Milk");

    assert!(store.delete_item(item.id).await.unwrap());
    assert!(store.get_entry(entry.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_clear_is_scoped_to_members() {
    let store = store().await;
    let alice = UserId::generate();
    let bob = UserId::generate();
    let (alices, _) = store
        .create_household_with_owner("Alice", alice)
        .await
        .unwrap();
    let (bobs, _) = store.create_household_with_owner("Bob", bob).await.unwrap();

    let milk = store
        .create_item(alices.id, alice, &NewPantryItem::named("Milk"))
        .await
        .unwrap();
    let eggs = store
        .create_item(bobs.id, bob, &NewPantryItem::named("Eggs"))
        .await
        .unwrap();
    store.add_entry(milk.id, alice).await.unwrap();
    store.add_entry(eggs.id, bob).await.unwrap();

    assert_eq!(store.clear_for_user(alice).await.unwrap(), 1);
    assert!(store.list_for_user(alice).await.unwrap().is_empty());
    assert_eq!(store.list_for_user(bob).await.unwrap().len(), 1);
}

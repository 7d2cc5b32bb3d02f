//! `PostgreSQL` implementation of the [`Datastore`] traits.
//!
//! Queries are checked at runtime (`query_as` with binds) so the crate builds
//! without a reachable database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use larder_core::{
    Email, HouseholdId, HouseholdRole, InvitationId, InvitationStatus, MembershipId, PantryItemId,
    ShoppingListEntryId, UserId,
};

use super::{
    Datastore, HouseholdRepository, InvitationRepository, LAST_OWNER, PantryItemRepository,
    RepositoryError, ShoppingListRepository, UserDirectory,
};
use crate::models::{
    Household, HouseholdMember, Invitation, NewInvitation, NewPantryItem, PantryItem,
    ShoppingListEntry, ShoppingListItem, UserProfile,
};

macro_rules! item_columns {
    () => {
        "id, household_id, name, brand, category, quantity, completion, expiry, purchase_date, \
         location, tags, notes, barcode, image, created_by, scanned_at, created_at"
    };
}

macro_rules! invitation_columns {
    () => {
        "id, household_id, email, role, status, invited_by, created_at, expires_at, email_sent_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct HouseholdRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<HouseholdRow> for Household {
    fn from(row: HouseholdRow) -> Self {
        Self {
            id: HouseholdId::new(row.id),
            name: row.name,
            owner_id: UserId::new(row.owner_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    household_id: Uuid,
    user_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for HouseholdMember {
    type Error = RepositoryError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MembershipId::new(row.id),
            household_id: HouseholdId::new(row.household_id),
            user_id: UserId::new(row.user_id),
            role: parse_role(&row.role)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    display_name: Option<String>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            email: parse_email(&row.email)?,
            display_name: row.display_name,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvitationRow {
    id: Uuid,
    household_id: Uuid,
    email: String,
    role: String,
    status: String,
    invited_by: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    email_sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = RepositoryError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<InvitationStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid invitation status in database: {e}"))
        })?;

        Ok(Self {
            id: InvitationId::new(row.id),
            household_id: HouseholdId::new(row.household_id),
            email: parse_email(&row.email)?,
            role: parse_role(&row.role)?,
            status,
            invited_by: UserId::new(row.invited_by),
            created_at: row.created_at,
            expires_at: row.expires_at,
            email_sent_at: row.email_sent_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    household_id: Uuid,
    name: String,
    brand: Option<String>,
    category: Option<String>,
    quantity: i32,
    completion: Option<i32>,
    expiry: Option<NaiveDate>,
    purchase_date: Option<NaiveDate>,
    location: Option<String>,
    tags: Vec<String>,
    notes: Option<String>,
    barcode: Option<String>,
    image: Option<String>,
    created_by: Uuid,
    scanned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for PantryItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: PantryItemId::new(row.id),
            household_id: HouseholdId::new(row.household_id),
            name: row.name,
            brand: row.brand,
            category: row.category,
            quantity: row.quantity,
            completion: row.completion,
            expiry: row.expiry,
            purchase_date: row.purchase_date,
            location: row.location,
            tags: row.tags,
            notes: row.notes,
            barcode: row.barcode,
            image: row.image,
            created_by: UserId::new(row.created_by),
            scanned_at: row.scanned_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    item_id: Uuid,
    added_by: Uuid,
    added_at: DateTime<Utc>,
}

impl From<EntryRow> for ShoppingListEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            id: ShoppingListEntryId::new(row.id),
            item_id: PantryItemId::new(row.item_id),
            added_by: UserId::new(row.added_by),
            added_at: row.added_at,
        }
    }
}

/// Entry joined with its item; entry columns are prefixed `entry_`.
#[derive(Debug, sqlx::FromRow)]
struct EntryWithItemRow {
    entry_id: Uuid,
    entry_added_by: Uuid,
    entry_added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    item: ItemRow,
}

impl From<EntryWithItemRow> for ShoppingListItem {
    fn from(row: EntryWithItemRow) -> Self {
        let item = PantryItem::from(row.item);
        Self {
            entry: ShoppingListEntry {
                id: ShoppingListEntryId::new(row.entry_id),
                item_id: item.id,
                added_by: UserId::new(row.entry_added_by),
                added_at: row.entry_added_at,
            },
            item,
        }
    }
}

fn parse_role(raw: &str) -> Result<HouseholdRole, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid role in database: {e}")))
}

fn parse_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
fn unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// Datastore backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HouseholdRepository for PgStore {
    async fn create_household_with_owner(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<(Household, HouseholdMember), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let household: Household = sqlx::query_as::<_, HouseholdRow>(
            r"
            INSERT INTO households (id, name, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, owner_id, created_at
            ",
        )
        .bind(HouseholdId::generate())
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let owner = sqlx::query_as::<_, MemberRow>(
            r"
            INSERT INTO household_members (id, household_id, user_id, role)
            VALUES ($1, $2, $3, 'owner')
            RETURNING id, household_id, user_id, role, created_at
            ",
        )
        .bind(MembershipId::generate())
        .bind(household.id)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        tx.commit().await?;

        Ok((household, owner))
    }

    async fn get_household(&self, id: HouseholdId) -> Result<Option<Household>, RepositoryError> {
        let row = sqlx::query_as::<_, HouseholdRow>(
            "SELECT id, name, owner_id, created_at FROM households WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn households_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Household>, RepositoryError> {
        let rows = sqlx::query_as::<_, HouseholdRow>(
            r"
            SELECT h.id, h.name, h.owner_id, h.created_at
            FROM households h
            JOIN household_members m ON m.household_id = h.id
            WHERE m.user_id = $1
            ORDER BY h.created_at
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError> {
        sqlx::query_as::<_, MemberRow>(
            r"
            SELECT id, household_id, user_id, role, created_at
            FROM household_members
            WHERE household_id = $1 AND user_id = $2
            ",
        )
        .bind(household_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list_members(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<HouseholdMember>, RepositoryError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r"
            SELECT id, household_id, user_id, role, created_at
            FROM household_members
            WHERE household_id = $1
            ORDER BY created_at
            ",
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
        role: HouseholdRole,
    ) -> Result<HouseholdMember, RepositoryError> {
        sqlx::query_as::<_, MemberRow>(
            r"
            INSERT INTO household_members (id, household_id, user_id, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, household_id, user_id, role, created_at
            ",
        )
        .bind(MembershipId::generate())
        .bind(household_id)
        .bind(user_id)
        .bind(role.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "already a member of this household"))?
        .try_into()
    }

    async fn remove_member(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Concurrent removals in one household queue behind this lock.
        sqlx::query("SELECT id FROM households WHERE id = $1 FOR UPDATE")
            .bind(household_id)
            .execute(&mut *tx)
            .await?;

        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM household_members WHERE household_id = $1 AND user_id = $2",
        )
        .bind(household_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(role) = role else {
            return Ok(false);
        };

        if role == "owner" {
            let owners: i64 = sqlx::query_scalar(
                r"
                SELECT COUNT(*) FROM household_members
                WHERE household_id = $1 AND role = 'owner'
                ",
            )
            .bind(household_id)
            .fetch_one(&mut *tx)
            .await?;

            if owners <= 1 {
                return Err(RepositoryError::Conflict(LAST_OWNER.to_string()));
            }
        }

        sqlx::query("DELETE FROM household_members WHERE household_id = $1 AND user_id = $2")
            .bind(household_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, display_name FROM profiles WHERE lower(email) = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }
}

#[async_trait]
impl InvitationRepository for PgStore {
    async fn create_invitation(&self, new: &NewInvitation) -> Result<Invitation, RepositoryError> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "INSERT INTO invitations (id, household_id, email, role, invited_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            invitation_columns!()
        ))
        .bind(InvitationId::generate())
        .bind(new.household_id)
        .bind(new.email.as_str())
        .bind(new.role.to_string())
        .bind(new.invited_by)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "an invitation is already pending for this email"))?
        .try_into()
    }

    async fn get_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn find_pending_invitation(
        &self,
        household_id: HouseholdId,
        email: &Email,
    ) -> Result<Option<Invitation>, RepositoryError> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations \
             WHERE household_id = $1 AND lower(email) = $2 AND status = 'pending'"
        ))
        .bind(household_id)
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list_invitations(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<Invitation>, RepositoryError> {
        let rows = sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations WHERE household_id = $1 ORDER BY created_at DESC"
        ))
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn refresh_invitation(
        &self,
        id: InvitationId,
        new: &NewInvitation,
    ) -> Result<Option<Invitation>, RepositoryError> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "UPDATE invitations \
             SET role = $2, invited_by = $3, expires_at = $4, email_sent_at = NULL \
             WHERE id = $1 AND status = 'pending' RETURNING ",
            invitation_columns!()
        ))
        .bind(id)
        .bind(new.role.to_string())
        .bind(new.invited_by)
        .bind(new.expires_at)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn mark_invitation_email_sent(
        &self,
        id: InvitationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE invitations SET email_sent_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn transition_invitation(
        &self,
        id: InvitationId,
        status: InvitationStatus,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE invitations SET status = $2 WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .bind(status.to_string())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_invitation(&self, id: InvitationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_invitations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM invitations WHERE status = 'pending' AND expires_at < $1")
                .bind(now)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PantryItemRepository for PgStore {
    async fn create_item(
        &self,
        household_id: HouseholdId,
        created_by: UserId,
        item: &NewPantryItem,
    ) -> Result<PantryItem, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(concat!(
            "INSERT INTO pantry_items \
             (id, household_id, name, brand, category, quantity, completion, expiry, \
              purchase_date, location, tags, notes, barcode, image, created_by, scanned_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING ",
            item_columns!()
        ))
        .bind(PantryItemId::generate())
        .bind(household_id)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.completion)
        .bind(item.expiry)
        .bind(item.purchase_date)
        .bind(&item.location)
        .bind(&item.tags)
        .bind(&item.notes)
        .bind(&item.barcode)
        .bind(&item.image)
        .bind(created_by)
        .bind(item.scanned_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_item(&self, id: PantryItemId) -> Result<Option<PantryItem>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(concat!(
            "SELECT ",
            item_columns!(),
            " FROM pantry_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_items(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<PantryItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(concat!(
            "SELECT ",
            item_columns!(),
            " FROM pantry_items WHERE household_id = $1 ORDER BY created_at DESC"
        ))
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_item(&self, item: &PantryItem) -> Result<Option<PantryItem>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(concat!(
            "UPDATE pantry_items SET \
             name = $2, brand = $3, category = $4, quantity = $5, completion = $6, \
             expiry = $7, purchase_date = $8, location = $9, tags = $10, notes = $11, \
             barcode = $12, image = $13, scanned_at = $14 \
             WHERE id = $1 RETURNING ",
            item_columns!()
        ))
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.completion)
        .bind(item.expiry)
        .bind(item.purchase_date)
        .bind(&item.location)
        .bind(&item.tags)
        .bind(&item.notes)
        .bind(&item.barcode)
        .bind(&item.image)
        .bind(item.scanned_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_item(&self, id: PantryItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pantry_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ShoppingListRepository for PgStore {
    async fn add_entry(
        &self,
        item_id: PantryItemId,
        added_by: UserId,
    ) -> Result<ShoppingListEntry, RepositoryError> {
        let row = sqlx::query_as::<_, EntryRow>(
            r"
            INSERT INTO shopping_list_entries (id, item_id, added_by)
            VALUES ($1, $2, $3)
            RETURNING id, item_id, added_by, added_at
            ",
        )
        .bind(ShoppingListEntryId::generate())
        .bind(item_id)
        .bind(added_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "already in list"))?;

        Ok(row.into())
    }

    async fn get_entry(
        &self,
        id: ShoppingListEntryId,
    ) -> Result<Option<ShoppingListEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, EntryRow>(
            "SELECT id, item_id, added_by, added_at FROM shopping_list_entries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShoppingListItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, EntryWithItemRow>(
            r"
            SELECT e.id AS entry_id, e.added_by AS entry_added_by, e.added_at AS entry_added_at,
                   i.id, i.household_id, i.name, i.brand, i.category, i.quantity, i.completion,
                   i.expiry, i.purchase_date, i.location, i.tags, i.notes, i.barcode, i.image,
                   i.created_by, i.scanned_at, i.created_at
            FROM shopping_list_entries e
            JOIN pantry_items i ON i.id = e.item_id
            JOIN household_members m ON m.household_id = i.household_id
            WHERE m.user_id = $1
            ORDER BY e.added_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_entry(&self, id: ShoppingListEntryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shopping_list_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shopping_list_entries
            WHERE item_id IN (
                SELECT i.id
                FROM pantry_items i
                JOIN household_members m ON m.household_id = i.household_id
                WHERE m.user_id = $1
            )
            ",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Datastore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

//! Initial database migration.
//!
//! Creates the transaction type enum, the family-partitioned tables, and the
//! trigger that pins every row to the family it was created in.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS & IDENTITIES
        // ============================================================
        db.execute_unprepared(FAMILIES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(CATEGORIES_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE transaction_type AS ENUM ('income', 'expense', 'bill');
";

const FAMILIES_SQL: &str = r"
CREATE TABLE families (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(120) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_families_name UNIQUE (name),
    CONSTRAINT chk_family_name_not_blank CHECK (btrim(name) <> '')
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL,
    password_hash TEXT,
    external_id VARCHAR(255),
    name VARCHAR(255),
    picture TEXT,
    family_id BIGINT NOT NULL REFERENCES families(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_users_email UNIQUE (email),
    CONSTRAINT uq_users_external_id UNIQUE (external_id),
    CONSTRAINT chk_email_normalized CHECK (email = lower(btrim(email)))
);

CREATE INDEX idx_users_family ON users(family_id);
";

const CATEGORIES_SQL: &str = r"
CREATE TABLE categories (
    id BIGSERIAL PRIMARY KEY,
    family_id BIGINT NOT NULL REFERENCES families(id),
    name VARCHAR(120) NOT NULL,
    name_key TEXT NOT NULL,
    monthly_budget NUMERIC(12, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- Same free text always resolves to the same category
    CONSTRAINT uq_categories_family_name_key UNIQUE (family_id, name_key),
    -- Target of the composite foreign key from transactions
    CONSTRAINT uq_categories_id_family UNIQUE (id, family_id),
    CONSTRAINT chk_monthly_budget_non_negative CHECK (monthly_budget >= 0)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    family_id BIGINT NOT NULL REFERENCES families(id),
    category_id BIGINT NOT NULL,
    amount NUMERIC(12, 2) NOT NULL,
    transaction_type transaction_type NOT NULL,
    note VARCHAR(255),
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- A transaction can only point at a category of its own family
    CONSTRAINT fk_transactions_category_same_family
        FOREIGN KEY (category_id, family_id) REFERENCES categories(id, family_id),
    CONSTRAINT chk_amount_positive CHECK (amount > 0)
);

-- Listing order and the monthly window
CREATE INDEX idx_transactions_family_occurred ON transactions(family_id, occurred_at DESC, id DESC);

CREATE INDEX idx_transactions_category ON transactions(category_id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_family_change
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_family_change()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.family_id IS DISTINCT FROM OLD.family_id THEN
        RAISE EXCEPTION 'family_id of % row % cannot change', TG_TABLE_NAME, OLD.id;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_users_family_immutable
BEFORE UPDATE OF family_id ON users
FOR EACH ROW
EXECUTE FUNCTION prevent_family_change();

CREATE TRIGGER trg_categories_family_immutable
BEFORE UPDATE OF family_id ON categories
FOR EACH ROW
EXECUTE FUNCTION prevent_family_change();

CREATE TRIGGER trg_transactions_family_immutable
BEFORE UPDATE OF family_id ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_family_change();
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS categories CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS families CASCADE;
DROP FUNCTION IF EXISTS prevent_family_change();
DROP TYPE IF EXISTS transaction_type;
";

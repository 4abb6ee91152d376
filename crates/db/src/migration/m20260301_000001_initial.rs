//! Initial database migration.
//!
//! Creates the ledger tables, their constraints and the guard triggers.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ORGANIZATION STRUCTURE
        // ============================================================
        db.execute_unprepared(ORGANIZATIONS_SQL).await?;
        db.execute_unprepared(BRANCHES_SQL).await?;

        // ============================================================
        // PART 2: NUMBERING
        // ============================================================
        db.execute_unprepared(DOCUMENT_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 3: CHART OF ACCOUNTS & FISCAL PERIODS
        // ============================================================
        db.execute_unprepared(CHART_OF_ACCOUNTS_SQL).await?;
        db.execute_unprepared(FISCAL_PERIODS_SQL).await?;

        // ============================================================
        // PART 4: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRY_LINES_SQL).await?;

        // ============================================================
        // PART 5: SOURCE DOCUMENTS
        // ============================================================
        db.execute_unprepared(SOURCE_DOCUMENTS_SQL).await?;
        db.execute_unprepared(RECEIPT_ALLOCATIONS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ORGANIZATIONS_SQL: &str = r"
CREATE TABLE organizations (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    settings JSONB DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const BRANCHES_SQL: &str = r"
CREATE TABLE branches (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_branch_code UNIQUE (organization_id, code)
);

CREATE INDEX idx_branches_org ON branches(organization_id);
";

const DOCUMENT_SEQUENCES_SQL: &str = r"
CREATE TABLE document_sequences (
    id UUID PRIMARY KEY,
    branch_id UUID NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
    module VARCHAR(50) NOT NULL,
    document_type VARCHAR(50) NOT NULL,
    prefix VARCHAR(20) NOT NULL,
    suffix VARCHAR(20),
    next_number BIGINT NOT NULL DEFAULT 1,
    padding INTEGER NOT NULL DEFAULT 5,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_sequence_key UNIQUE (branch_id, module, document_type),
    CONSTRAINT chk_next_number_positive CHECK (next_number >= 1),
    CONSTRAINT chk_padding_range CHECK (padding BETWEEN 0 AND 18)
);
";

const CHART_OF_ACCOUNTS_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    account_code VARCHAR(20) NOT NULL,
    account_name VARCHAR(255) NOT NULL,
    account_type VARCHAR(16) NOT NULL,
    allow_direct_posting BOOLEAN NOT NULL DEFAULT true,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_account_code UNIQUE (organization_id, account_code),
    CONSTRAINT chk_account_type CHECK (
        account_type IN ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE')
    )
);

CREATE INDEX idx_coa_org ON chart_of_accounts(organization_id);
";

const FISCAL_PERIODS_SQL: &str = r"
CREATE TABLE fiscal_periods (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    period_name VARCHAR(50) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_closed BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_period_dates CHECK (end_date >= start_date)
);

CREATE INDEX idx_fiscal_periods_org_dates ON fiscal_periods(organization_id, start_date, end_date);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    branch_id UUID NOT NULL REFERENCES branches(id),
    fiscal_period_id UUID NOT NULL REFERENCES fiscal_periods(id),
    journal_no VARCHAR(50) NOT NULL,
    entry_date DATE NOT NULL,
    description TEXT,
    journal_type VARCHAR(30) NOT NULL DEFAULT 'GENERAL',
    status VARCHAR(16) NOT NULL DEFAULT 'DRAFT',
    total_debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    source VARCHAR(16) NOT NULL DEFAULT 'MANUAL',
    source_ref UUID,
    posted_by UUID,
    posted_at TIMESTAMPTZ,
    voided_by UUID,
    voided_at TIMESTAMPTZ,
    created_by UUID,
    updated_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_journal_no UNIQUE (branch_id, journal_no),
    CONSTRAINT chk_journal_status CHECK (status IN ('DRAFT', 'POSTED', 'VOID')),
    CONSTRAINT chk_journal_source CHECK (
        source IN ('MANUAL', 'BILL', 'INVOICE', 'RECEIPT', 'MIGRATION')
    ),
    CONSTRAINT chk_journal_balanced CHECK (
        status = 'DRAFT' OR ABS(total_debit - total_credit) <= 0.01
    ),
    CONSTRAINT chk_posted_stamp CHECK (
        status = 'DRAFT' OR posted_at IS NOT NULL
    )
);

CREATE UNIQUE INDEX uq_journal_source_ref ON journal_entries(source, source_ref)
    WHERE source_ref IS NOT NULL;
CREATE INDEX idx_journal_branch_date ON journal_entries(branch_id, entry_date);
CREATE INDEX idx_journal_status ON journal_entries(status);
";

const JOURNAL_ENTRY_LINES_SQL: &str = r"
CREATE TABLE journal_entry_lines (
    id UUID PRIMARY KEY,
    journal_entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    description TEXT,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,

    CONSTRAINT uq_line_no UNIQUE (journal_entry_id, line_no),
    CONSTRAINT chk_line_no_positive CHECK (line_no >= 1),
    CONSTRAINT chk_one_side CHECK (
        (debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0)
    )
);

CREATE INDEX idx_lines_account ON journal_entry_lines(account_id);
";

const SOURCE_DOCUMENTS_SQL: &str = r"
CREATE TABLE source_documents (
    id UUID PRIMARY KEY,
    branch_id UUID NOT NULL REFERENCES branches(id),
    kind VARCHAR(16) NOT NULL,
    document_no VARCHAR(50) NOT NULL,
    document_date DATE NOT NULL,
    due_date DATE,
    counterparty_id UUID,
    description TEXT,
    total_amount NUMERIC(19, 4) NOT NULL,
    paid_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance_due NUMERIC(19, 4) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'DRAFT',
    created_by UUID,
    updated_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_document_no UNIQUE (branch_id, kind, document_no),
    CONSTRAINT chk_document_kind CHECK (kind IN ('BILL', 'INVOICE', 'RECEIPT')),
    CONSTRAINT chk_document_status CHECK (
        status IN ('DRAFT', 'POSTED', 'PARTIALLY_PAID', 'PAID', 'VOID')
    ),
    CONSTRAINT chk_document_amounts CHECK (
        total_amount > 0
        AND paid_amount >= 0
        AND paid_amount <= total_amount
        AND balance_due = total_amount - paid_amount
    )
);

CREATE INDEX idx_documents_branch_kind ON source_documents(branch_id, kind, document_date);
";

const RECEIPT_ALLOCATIONS_SQL: &str = r"
CREATE TABLE receipt_allocations (
    id UUID PRIMARY KEY,
    receipt_id UUID NOT NULL REFERENCES source_documents(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES source_documents(id),
    amount NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_allocation UNIQUE (receipt_id, invoice_id),
    CONSTRAINT chk_allocation_positive CHECK (amount > 0)
);

CREATE INDEX idx_allocations_invoice ON receipt_allocations(invoice_id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_posted_journal_modification
-- Posted entries may only move to VOID; voided entries are frozen
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_journal_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status = 'POSTED' AND NEW.status <> 'VOID' THEN
        RAISE EXCEPTION 'Cannot modify posted journal entry %', OLD.journal_no;
    END IF;

    IF OLD.status = 'VOID' THEN
        RAISE EXCEPTION 'Cannot modify voided journal entry %', OLD.journal_no;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_journal_mod
BEFORE UPDATE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_journal_modification();

-- ============================================================
-- FUNCTION: prevent_posted_line_modification
-- Lines of a non-draft entry are immutable
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_line_modification()
RETURNS TRIGGER AS $$
DECLARE
    entry_status VARCHAR(16);
BEGIN
    SELECT je.status INTO entry_status
    FROM journal_entries je
    WHERE je.id = COALESCE(NEW.journal_entry_id, OLD.journal_entry_id);

    IF entry_status IS NOT NULL AND entry_status <> 'DRAFT' AND TG_OP <> 'INSERT' THEN
        RAISE EXCEPTION 'Cannot modify lines of a % journal entry', entry_status;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_line_mod
BEFORE UPDATE OR DELETE ON journal_entry_lines
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_line_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_posted_line_mod ON journal_entry_lines;
DROP TRIGGER IF EXISTS trg_prevent_posted_journal_mod ON journal_entries;
DROP FUNCTION IF EXISTS prevent_posted_line_modification();
DROP FUNCTION IF EXISTS prevent_posted_journal_modification();

DROP TABLE IF EXISTS receipt_allocations CASCADE;
DROP TABLE IF EXISTS source_documents CASCADE;
DROP TABLE IF EXISTS journal_entry_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS fiscal_periods CASCADE;
DROP TABLE IF EXISTS chart_of_accounts CASCADE;
DROP TABLE IF EXISTS document_sequences CASCADE;
DROP TABLE IF EXISTS branches CASCADE;
DROP TABLE IF EXISTS organizations CASCADE;
";

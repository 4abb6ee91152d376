//! Seeds a demo organization for local development.
//!
//! Creates one organization with a head-office branch, a small chart of
//! accounts, the GL account map and monthly fiscal periods for 2026, then
//! posts a bill, an invoice, a receipt and a manual journal entry and logs
//! the resulting trial balance.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tallybook_core::documents::SourceKind;
use tallybook_core::ledger::{AccountType, CreateJournalInput, JournalLineInput, JournalSource};
use tallybook_core::posting::GlAccountMap;
use tallybook_core::reports::ReportFilter;
use tallybook_db::repositories::{
    AccountRepository, BranchRepository, CreateAccountInput, CreateDocumentInput,
    DocumentRepository, FiscalRepository, JournalRepository, OrganizationRepository,
    ReportRepository,
};
use tallybook_shared::AppConfig;
use tallybook_shared::types::{AccountId, BranchId, FiscalPeriodId, OrganizationId, UserId};

const FISCAL_YEAR: i32 = 2026;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tallybook=debug,seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = tallybook_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let user_id = UserId::new();

    let organization = OrganizationRepository::new(db.clone())
        .create_organization("Demo Trading")
        .await?;
    let organization_id = OrganizationId::from_uuid(organization.id);
    info!(%organization_id, "Seeded organization");

    let branch = BranchRepository::new(db.clone())
        .create_branch(organization_id, "HQ", "Head Office")
        .await?;
    let branch_id = BranchId::from_uuid(branch.id);

    let gl = seed_accounts(&AccountRepository::new(db.clone()), organization_id).await?;
    OrganizationRepository::new(db.clone())
        .set_gl_accounts(organization_id, &gl)
        .await?;
    info!("Seeded chart of accounts and GL account map");

    let periods = FiscalRepository::new(db.clone())
        .create_monthly_periods(organization_id, FISCAL_YEAR)
        .await?;
    info!(count = periods.len(), year = FISCAL_YEAR, "Seeded fiscal periods");

    let documents = DocumentRepository::with_config(db.clone(), &config.ledger);
    let date = |month, day| {
        NaiveDate::from_ymd_opt(FISCAL_YEAR, month, day).context("invalid seed date")
    };

    let bill = documents
        .create_document(
            SourceKind::Bill,
            branch_id,
            CreateDocumentInput::new(date(1, 10)?, dec!(500)),
            user_id,
        )
        .await?;
    let (_, outcome) = documents
        .post_document(bill.document.id.into(), organization_id, user_id)
        .await?;
    info!(document_no = %bill.document.document_no, ?outcome, "Posted bill");

    let invoice = documents
        .create_document(
            SourceKind::Invoice,
            branch_id,
            CreateDocumentInput::new(date(1, 12)?, dec!(800)),
            user_id,
        )
        .await?;
    let invoice_id = invoice.document.id.into();
    documents
        .post_document(invoice_id, organization_id, user_id)
        .await?;

    let receipt = documents
        .create_document(
            SourceKind::Receipt,
            branch_id,
            CreateDocumentInput::new(date(1, 20)?, dec!(300)).allocate(invoice_id, dec!(300)),
            user_id,
        )
        .await?;
    documents
        .post_document(receipt.document.id.into(), organization_id, user_id)
        .await?;
    info!("Posted invoice and partial receipt");

    let january = periods
        .first()
        .map(|p| FiscalPeriodId::from_uuid(p.id))
        .context("no fiscal periods created")?;
    let journals = JournalRepository::new(db.clone()).with_max_retries(config.ledger.max_retries);
    let entry = journals
        .create_journal_entry(
            branch_id,
            CreateJournalInput {
                fiscal_period_id: january,
                entry_date: date(1, 31)?,
                description: Some("Owner funds expense".to_string()),
                journal_type: None,
                source: JournalSource::Manual,
                source_ref: None,
                lines: vec![
                    JournalLineInput::debit(gl.expense.context("expense unset")?, dec!(45.50)),
                    JournalLineInput::credit(gl.cash.context("cash unset")?, dec!(45.50)),
                ],
            },
            user_id,
        )
        .await?;
    journals
        .post_journal_entry(entry.entry.id.into(), user_id)
        .await?;

    let report = ReportRepository::with_config(db, config.reports)
        .get_trial_balance(
            organization_id,
            ReportFilter::between(date(1, 1)?, date(12, 31)?),
        )
        .await?;
    for row in &report.rows {
        info!(
            code = %row.account_code,
            debit = %row.total_debit,
            credit = %row.total_credit,
            balance = %row.balance,
            "Trial balance"
        );
    }
    info!(balanced = report.totals.is_balanced, "Seeding complete");

    Ok(())
}

async fn seed_accounts(
    accounts: &AccountRepository,
    organization_id: OrganizationId,
) -> anyhow::Result<GlAccountMap> {
    let create = |code: &'static str, name: &'static str, account_type: AccountType| {
        create_account(accounts, organization_id, code, name, account_type)
    };

    Ok(GlAccountMap {
        cash: Some(create("1000", "Cash", AccountType::Asset).await?),
        accounts_receivable: Some(create("1100", "Accounts Receivable", AccountType::Asset).await?),
        accounts_payable: Some(create("2000", "Accounts Payable", AccountType::Liability).await?),
        revenue: Some(create("4000", "Sales Revenue", AccountType::Revenue).await?),
        expense: Some(create("6000", "General Expense", AccountType::Expense).await?),
    })
}

async fn create_account(
    accounts: &AccountRepository,
    organization_id: OrganizationId,
    code: &str,
    name: &str,
    account_type: AccountType,
) -> anyhow::Result<AccountId> {
    let account = accounts
        .create_account(CreateAccountInput::posting(
            organization_id,
            code,
            name,
            account_type,
        ))
        .await
        .with_context(|| format!("failed to create account {code}"))?;
    Ok(AccountId::from_uuid(account.id))
}

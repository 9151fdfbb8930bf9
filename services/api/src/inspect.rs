use crate::infra::{
    load_seed, parse_category, parse_date, parse_extension_doc_type, parse_role,
    InMemoryDocumentStore, InMemoryRoleDirectory,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use repositorio::documents::{
    Caller, CallerRole, DocumentCategory, DocumentService, ExtensionDocType, ListingFilters,
    RoleGrant, UserId, ValidityFilter,
};
use repositorio::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CLI_OPERATOR: &str = "cli-operator";

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    /// JSON array of stored records
    #[arg(long)]
    pub(crate) seed: PathBuf,
    /// Role to browse as (anonymous, user, authority, admin)
    #[arg(long, default_value = "user", value_parser = parse_role)]
    pub(crate) role: CallerRole,
    /// Directory section (convenios, extension, movilidad, pasantias, resoluciones, otros)
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<DocumentCategory>,
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Free-text search over title, codes, authors and director
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Only vigente Convenios (requires --category convenios)
    #[arg(long, conflicts_with = "expired")]
    pub(crate) current: bool,
    /// Only vencido Convenios (requires --category convenios)
    #[arg(long)]
    pub(crate) expired: bool,
    /// Director name fragment (requires --category extension)
    #[arg(long)]
    pub(crate) director: Option<String>,
    /// Extension sub-type such as "Informe final" (admin and authority only)
    #[arg(long, value_parser = parse_extension_doc_type)]
    pub(crate) subtype: Option<ExtensionDocType>,
    /// Evaluation date for validity badges (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Write CSV to stdout instead of a table
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TimelineArgs {
    /// JSON array of stored records
    #[arg(long)]
    pub(crate) seed: PathBuf,
    /// Project code, for example FCA-EXT-001-2024
    pub(crate) project_code: String,
    #[arg(long, default_value = "user", value_parser = parse_role)]
    pub(crate) role: CallerRole,
}

impl ListArgs {
    fn filters(&self) -> ListingFilters {
        let validity = match (self.current, self.expired) {
            (true, _) => Some(ValidityFilter::Vigente),
            (_, true) => Some(ValidityFilter::Vencido),
            _ => None,
        };
        ListingFilters {
            category: self.category,
            year: self.year,
            search: self.search.clone(),
            validity,
            director: self.director.clone(),
            extension_doc_type: self.subtype,
        }
    }
}

type LocalService = DocumentService<InMemoryDocumentStore, InMemoryRoleDirectory>;

fn service_for(seed: &Path, role: CallerRole) -> Result<(LocalService, Caller), AppError> {
    let records = load_seed(seed)?;
    let store = InMemoryDocumentStore::with_records(records);
    let operator = UserId(CLI_OPERATOR.to_string());
    let roles = match role {
        CallerRole::Anonymous | CallerRole::User => InMemoryRoleDirectory::default(),
        CallerRole::Authority => {
            InMemoryRoleDirectory::with_grant(operator.clone(), RoleGrant::Authority)
        }
        CallerRole::Admin => InMemoryRoleDirectory::with_grant(operator.clone(), RoleGrant::Admin),
    };
    let service = DocumentService::new(Arc::new(store), Arc::new(roles));
    let caller = match role {
        CallerRole::Anonymous => Caller::anonymous(),
        _ => service.caller_for(Some(operator))?,
    };
    Ok((service, caller))
}

pub(crate) fn run_document_listing(args: ListArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let (service, caller) = service_for(&args.seed, args.role)?;
    let filters = args.filters();

    if args.csv {
        service.export_csv(&caller, &filters, today, std::io::stdout().lock())?;
        return Ok(());
    }

    let rows = service.list(&caller, &filters, today)?;
    println!("{} documents visible to {} callers", rows.len(), caller.role);
    for row in rows {
        let badge = row
            .validity
            .map(|status| format!(" [{}]", status.label()))
            .unwrap_or_default();
        println!(
            "- {} | {} | {}{}",
            row.type_label,
            row.title,
            row.reference_code.as_deref().unwrap_or("-"),
            badge
        );
        if let Some(expires_on) = row.expires_on {
            println!("    expires {expires_on}");
        }
    }
    Ok(())
}

pub(crate) fn run_project_timeline(args: TimelineArgs) -> Result<(), AppError> {
    let (service, caller) = service_for(&args.seed, args.role)?;
    let timeline = service.timeline(&caller, &args.project_code)?;

    println!("Project {}", timeline.project_code);
    if timeline.master_id.is_none() {
        println!("  (no master project record visible)");
    }
    for entry in &timeline.entries {
        let marker = if entry.is_master { "*" } else { "-" };
        println!(
            "  {marker} {} | {} | {}",
            entry.uploaded_at.format("%Y-%m-%d"),
            entry.stage_label,
            entry.title
        );
    }
    Ok(())
}

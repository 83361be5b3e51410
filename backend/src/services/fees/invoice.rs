use crate::config::FeesConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::job_controller::state::JobUpdate;
use crate::services::auth::{AdminUser, CurrentUser};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::jobs::JobStatus;
use common::model::fee::{format_rand, FeeItem, FeeStatement};
use genpdf::elements::{Break, Paragraph, TableLayout};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::Style;
use genpdf::{Alignment, Document, Element};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

const FALLBACK_FONT: &str = "LiberationSans";
const SCHOOL_NAME: &str = "Grace Artisan School";

/// One printed line of an invoice: label and formatted amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub label: String,
    pub amount: String,
    pub emphasised: bool,
}

impl InvoiceLine {
    fn new(label: impl Into<String>, cents: i64, emphasised: bool) -> Self {
        Self {
            label: label.into(),
            amount: format_rand(cents),
            emphasised,
        }
    }
}

/// Schedule items in order, then the total, the amount paid and what is
/// still owed.
pub fn invoice_lines(statement: &FeeStatement, items: &[FeeItem]) -> Vec<InvoiceLine> {
    let mut lines: Vec<InvoiceLine> = items
        .iter()
        .map(|item| InvoiceLine::new(item.label.as_str(), item.amount_cents, false))
        .collect();
    lines.push(InvoiceLine::new("Total", statement.total_cents, true));
    lines.push(InvoiceLine::new("Paid", statement.paid_cents, false));
    lines.push(InvoiceLine::new("Amount owed", statement.owed_cents, true));
    lines
}

/// The configured family, or `LiberationSans` from the same directory.
fn load_font(config: &FeesConfig) -> Result<FontFamily<FontData>, genpdf::error::Error> {
    match genpdf::fonts::from_files(&config.fonts_dir, &config.font_family, None) {
        Ok(family) => Ok(family),
        Err(e) => {
            log::debug!(
                "Font {} unavailable ({e}), trying {FALLBACK_FONT}",
                config.font_family
            );
            genpdf::fonts::from_files(&config.fonts_dir, FALLBACK_FONT, None)
        }
    }
}

fn pdf_error(e: genpdf::error::Error) -> ServiceError {
    ServiceError::Internal(format!("Invoice rendering failed: {e}"))
}

/// Renders the invoice of one statement as PDF into `out`.
pub fn render_invoice<W: Write>(
    config: &FeesConfig,
    statement: &FeeStatement,
    items: &[FeeItem],
    out: W,
) -> ServiceResult<()> {
    let font = load_font(config).map_err(pdf_error)?;
    let mut doc = Document::new(font);
    doc.set_title(format!("Invoice {}", statement.student_number));
    doc.set_font_size(10);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    doc.push(Paragraph::new(SCHOOL_NAME).styled(Style::new().bold().with_font_size(16)));
    doc.push(Paragraph::new("Invoice"));
    doc.push(Break::new(1));
    doc.push(Paragraph::new(format!("Student: {}", statement.name)));
    doc.push(Paragraph::new(format!(
        "Student number: {}",
        statement.student_number
    )));
    doc.push(Break::new(1));

    let mut table = TableLayout::new(vec![3, 1]);
    for line in invoice_lines(statement, items) {
        let style = if line.emphasised {
            Style::new().bold()
        } else {
            Style::new()
        };
        table
            .row()
            .element(Paragraph::new(line.label).styled(style))
            .element(
                Paragraph::new(line.amount)
                    .aligned(Alignment::Right)
                    .styled(style),
            )
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(table);
    doc.render(out).map_err(pdf_error)
}

fn file_name_for(student_number: &str) -> String {
    let safe: String = student_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("invoice_{safe}.pdf")
}

pub async fn process(
    state: web::Data<AppState>,
    user: CurrentUser,
    student_number: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    super::authorize_account(&state, &user, &student_number)?;
    let account = super::fetch_account(&state, &student_number)?;
    let items = super::fee_items(&state)?;
    let statement = FeeStatement::new(&account, &items);

    let config = state.config.fees.clone();
    let pdf = web::block(move || -> ServiceResult<Vec<u8>> {
        let mut buffer = Vec::new();
        render_invoice(&config, &statement, &items, &mut buffer)?;
        Ok(buffer)
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("Invoice task failed: {e}")))??;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            "Content-Disposition",
            format!(
                "inline; filename=\"{}\"",
                file_name_for(&account.student_number)
            ),
        ))
        .body(pdf))
}

/// Writes one invoice per account into the invoice directory, reporting
/// progress as a percentage.
fn write_all_invoices(
    app: &AppState,
    tx: &mpsc::Sender<JobUpdate>,
    job_id: &str,
    dir: &Path,
) -> ServiceResult<usize> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ServiceError::Internal(format!("Cannot create {}: {e}", dir.display())))?;
    let items = super::fee_items(app)?;
    let statements = super::statements(app, None)?;
    let total = statements.len().max(1);

    for (done, statement) in statements.iter().enumerate() {
        let path: PathBuf = dir.join(file_name_for(&statement.student_number));
        let file = std::fs::File::create(&path)
            .map_err(|e| ServiceError::Internal(format!("Cannot write {}: {e}", path.display())))?;
        render_invoice(&app.config.fees, statement, &items, file)?;
        let percent = ((done + 1) * 100 / total) as u32;
        if tx
            .blocking_send(JobUpdate::new(job_id, JobStatus::InProgress(percent)))
            .is_err()
        {
            log::warn!("Job updater stopped, invoice job {job_id} continues silently");
        }
    }
    Ok(statements.len())
}

pub async fn start_batch(
    state: web::Data<AppState>,
    admin: AdminUser,
) -> Result<HttpResponse, ServiceError> {
    let job_id = state.jobs.register().await;
    let app = state.get_ref().clone();
    let job = job_id.clone();

    tokio::spawn(async move {
        let jobs = app.jobs.clone();
        let tx = jobs.tx.clone();
        let dir = app.config.fees.invoice_dir.clone();
        let job_for_blocking = job.clone();
        let handle = tokio::task::spawn_blocking(move || {
            write_all_invoices(&app, &tx, &job_for_blocking, &dir)
        });

        let status = match handle.await {
            Ok(Ok(count)) => JobStatus::Completed(format!("{count} invoices written")),
            Ok(Err(e)) => {
                log::error!("Invoice job {job} failed: {e}");
                JobStatus::Failed(e.to_string())
            }
            Err(e) => {
                log::error!("Invoice job {job} panicked: {e}");
                JobStatus::Failed("Invoice job aborted".to_string())
            }
        };
        jobs.set(&job, status).await;
    });

    log::info!("{} started invoice job {}", admin.full_name(), job_id);
    Ok(HttpResponse::Accepted().json(json!({ "job_id": job_id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::fee::{FeeAccount, DEFAULT_FEE_SCHEDULE};

    fn schedule() -> Vec<FeeItem> {
        DEFAULT_FEE_SCHEDULE
            .iter()
            .enumerate()
            .map(|(i, (key, label, cents))| FeeItem {
                id: String::new(),
                key: key.to_string(),
                label: label.to_string(),
                amount_cents: *cents,
                position: i as i64,
            })
            .collect()
    }

    #[test]
    fn lines_end_with_totals() {
        let items = schedule();
        let account = FeeAccount {
            id: String::new(),
            student_number: "900101".into(),
            name: "Thandi Mokoena".into(),
            paid_cents: 500_000,
            updated_at: chrono::Utc::now(),
        };
        let lines = invoice_lines(&FeeStatement::new(&account, &items), &items);

        assert_eq!(lines.len(), items.len() + 3);
        assert_eq!(lines[0].label, "Registration Fee");
        assert_eq!(lines[0].amount, "R2799.84");
        let owed = lines.last().unwrap();
        assert_eq!(owed.label, "Amount owed");
        assert_eq!(owed.amount, "R5484.16");
        assert!(owed.emphasised);
    }

    #[test]
    fn missing_fonts_are_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeesConfig {
            fonts_dir: dir.path().to_path_buf(),
            ..FeesConfig::default()
        };
        let statement = FeeStatement {
            student_number: "1".into(),
            name: "A".into(),
            total_cents: 0,
            paid_cents: 0,
            owed_cents: 0,
        };
        let result = render_invoice(&config, &statement, &[], Vec::new());
        assert!(matches!(result, Err(ServiceError::Internal(_))));
    }

    #[test]
    fn file_names_are_path_safe() {
        assert_eq!(file_name_for("900101-2"), "invoice_900101-2.pdf");
        assert_eq!(file_name_for("../x"), "invoice____x.pdf");
    }
}

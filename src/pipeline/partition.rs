//! Page partitioning: turn classifier assertions into single-page artifacts.
//!
//! Partitioning runs in two passes over the same ordered data:
//!
//! 1. [`plan_partition`] walks the documents in result order and each
//!    document's bounding regions in their given order, deciding for every
//!    page reference whether it becomes a claim or a recorded skip. This pass
//!    is pure and never touches the PDF.
//! 2. [`execute_plan`] opens the source once and extracts every claimed page,
//!    emitting artifacts in plan order.
//!
//! First claim wins: once a zero-based page index is claimed, later
//! references to it are dropped as [`SkipEvent::DuplicatePageClaim`] even
//! when they come from a differently-typed document. Confidence is never
//! used as a tie-break.

use crate::config::PageFailurePolicy;
use crate::error::{PdfSplitError, SkipEvent};
use crate::model::{ClassificationDocument, ClassificationResult, PartitionOutput, SplitArtifact};
use crate::pipeline::extract::{PageExtractor, SourcePages};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// A page assigned to a document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageClaim {
    /// Zero-based page index.
    pub page_index: usize,
    /// Lower-cased document type.
    pub doc_type: String,
}

/// One decision of the planning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Claim(PageClaim),
    Skip(SkipEvent),
}

/// Ordered planning decisions for one classification result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionPlan {
    pub steps: Vec<PlanStep>,
}

impl PartitionPlan {
    /// Claims in artifact order.
    pub fn claims(&self) -> impl Iterator<Item = &PageClaim> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Claim(c) => Some(c),
            PlanStep::Skip(_) => None,
        })
    }

    /// Skip events recorded while planning.
    pub fn skips(&self) -> impl Iterator<Item = &SkipEvent> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Skip(e) => Some(e),
            PlanStep::Claim(_) => None,
        })
    }

    pub fn has_claims(&self) -> bool {
        self.claims().next().is_some()
    }
}

/// Accumulator state for one planning pass.
///
/// Owned by a single call to [`plan_partition`]; nothing survives the call.
struct Planner<'a> {
    recognized: &'a BTreeSet<String>,
    /// page index → type that claimed it
    claimed: HashMap<usize, String>,
    plan: PartitionPlan,
}

impl<'a> Planner<'a> {
    fn new(recognized: &'a BTreeSet<String>) -> Self {
        Self {
            recognized,
            claimed: HashMap::new(),
            plan: PartitionPlan::default(),
        }
    }

    fn add_document(&mut self, doc: &ClassificationDocument) {
        let doc_type = doc.doc_type.to_lowercase();

        if !self.recognized.contains(&doc_type) {
            let event = SkipEvent::UnrecognizedDocumentType {
                doc_type,
                pages: doc.page_numbers(),
            };
            info!("{}", event);
            self.plan.steps.push(PlanStep::Skip(event));
            return;
        }

        for region in &doc.bounding_regions {
            let Some(page_index) = region.page_index() else {
                let event = SkipEvent::InvalidPageNumber {
                    page_number: region.page_number,
                    doc_type: doc_type.clone(),
                };
                warn!("{}", event);
                self.plan.steps.push(PlanStep::Skip(event));
                continue;
            };

            if let Some(owner) = self.claimed.get(&page_index) {
                let event = SkipEvent::DuplicatePageClaim {
                    page: page_index + 1,
                    doc_type: doc_type.clone(),
                    claimed_by: owner.clone(),
                };
                info!("{}", event);
                self.plan.steps.push(PlanStep::Skip(event));
                continue;
            }

            self.claimed.insert(page_index, doc_type.clone());
            self.plan.steps.push(PlanStep::Claim(PageClaim {
                page_index,
                doc_type: doc_type.clone(),
            }));
        }
    }
}

/// Decide which page goes to which type, without opening the PDF.
pub fn plan_partition(
    result: &ClassificationResult,
    recognized_types: &BTreeSet<String>,
) -> PartitionPlan {
    let mut planner = Planner::new(recognized_types);
    for doc in &result.documents {
        planner.add_document(doc);
    }
    planner.plan
}

/// Extract every claimed page of `plan` from `source`.
///
/// The source document is only opened when the plan contains at least one
/// claim. It is released before this function returns, on success and on
/// error alike.
///
/// # Errors
/// - [`PdfSplitError::SourceDocumentUnreadable`] if the source cannot be opened
/// - [`PdfSplitError::PageOutOfRange`] / [`PdfSplitError::PageExtractionFailed`]
///   under [`PageFailurePolicy::Abort`]; no artifacts are returned in that case
pub fn execute_plan(
    extractor: &dyn PageExtractor,
    source: &[u8],
    password: Option<&str>,
    plan: &PartitionPlan,
    policy: PageFailurePolicy,
) -> Result<PartitionOutput, PdfSplitError> {
    if !plan.has_claims() {
        debug!("No page claims; source document not opened");
        return Ok(PartitionOutput {
            artifacts: Vec::new(),
            events: plan.skips().cloned().collect(),
        });
    }

    let mut output = PartitionOutput::default();
    extractor.with_source(source, password, &mut |pages: &mut dyn SourcePages| {
        extract_steps(pages, plan, policy, &mut output)
    })?;

    info!(
        "Partitioned into {} artifacts ({} skipped references)",
        output.artifacts.len(),
        output.events.len()
    );
    Ok(output)
}

fn extract_steps(
    pages: &mut dyn SourcePages,
    plan: &PartitionPlan,
    policy: PageFailurePolicy,
    output: &mut PartitionOutput,
) -> Result<(), PdfSplitError> {
    let total = pages.page_count();
    debug!("Source document has {} pages", total);

    for step in &plan.steps {
        let claim = match step {
            PlanStep::Skip(event) => {
                output.events.push(event.clone());
                continue;
            }
            PlanStep::Claim(claim) => claim,
        };

        let extracted = if claim.page_index >= total {
            Err(PdfSplitError::PageOutOfRange {
                page: claim.page_index + 1,
                total,
            })
        } else {
            pages.extract_page(claim.page_index)
        };

        match extracted {
            Ok(bytes) => {
                debug!(
                    "Split page {} as {} ({} bytes)",
                    claim.page_index + 1,
                    claim.doc_type,
                    bytes.len()
                );
                output.artifacts.push(SplitArtifact {
                    bytes,
                    doc_type: claim.doc_type.clone(),
                    page_index: claim.page_index,
                });
            }
            Err(e) if policy == PageFailurePolicy::Abort => return Err(e),
            Err(e) => {
                let event = SkipEvent::ExtractionFailed {
                    page: claim.page_index + 1,
                    doc_type: claim.doc_type.clone(),
                    detail: e.to_string(),
                };
                warn!("{}", event);
                output.events.push(event);
            }
        }
    }

    Ok(())
}

/// Plan and extract in one call.
pub fn partition(
    extractor: &dyn PageExtractor,
    source: &[u8],
    password: Option<&str>,
    result: &ClassificationResult,
    recognized_types: &BTreeSet<String>,
    policy: PageFailurePolicy,
) -> Result<PartitionOutput, PdfSplitError> {
    let plan = plan_partition(result, recognized_types);
    execute_plan(extractor, source, password, &plan, policy)
}

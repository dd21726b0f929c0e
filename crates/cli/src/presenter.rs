//! Terminal merge presenter: walks the operator through a conflict batch.

use chrono::Utc;
use dialoguer::Select;

use settingsrepo_core::conflict::{
    MergePresenter, MergeRequest, PresentationOutcome, Side, VirtualContent,
};
use settingsrepo_core::errors::ConflictError;

use crate::style;

const PREVIEW_LINES: usize = 12;

/// Prompts once per conflicted path. Must run on the executor thread that
/// owns the terminal.
pub struct TerminalPresenter;

enum Action {
    Keep(Side),
    Skip,
    Cancel,
}

impl TerminalPresenter {
    fn prompt(
        &self,
        request: &MergeRequest,
        position: usize,
        total: usize,
    ) -> Result<Action, ConflictError> {
        println!();
        println!(
            "{}",
            style::header(&format!("[{}/{}] {}", position, total, request.path))
        );
        print_side(&style::local_label(), request.candidate.side(Side::Current));
        print_side(&style::incoming_label(), request.candidate.side(Side::Incoming));

        let choice = Select::new()
            .with_prompt("Resolution")
            .items(&["Keep local", "Take incoming", "Skip", "Cancel remaining"])
            .default(0)
            .interact()
            .map_err(|e| ConflictError::PresentationFailed(e.to_string()))?;

        Ok(match choice {
            0 => Action::Keep(Side::Current),
            1 => Action::Keep(Side::Incoming),
            2 => Action::Skip,
            _ => Action::Cancel,
        })
    }
}

impl MergePresenter for TerminalPresenter {
    fn present(&self, batch: &[MergeRequest]) -> Result<PresentationOutcome, ConflictError> {
        let mut resolved = Vec::new();

        for (i, request) in batch.iter().enumerate() {
            match self.prompt(request, i + 1, batch.len())? {
                Action::Keep(side) => {
                    match request.candidate.side(side) {
                        Some(content) => request.result.set_binary_content(
                            content.to_vec(),
                            0,
                            Utc::now(),
                        )?,
                        None => request.result.mark_deleted(Utc::now())?,
                    }
                    resolved.push(request.path.clone());
                }
                Action::Skip => println!("{}", style::dim("skipped")),
                Action::Cancel => {
                    println!("{}", style::warn("remaining conflicts left unresolved"));
                    return Ok(PresentationOutcome::cancelled(resolved));
                }
            }
        }

        Ok(PresentationOutcome::completed(resolved))
    }
}

fn print_side(label: &str, content: Option<&[u8]>) {
    match content {
        None => println!("  {}: {}", label, style::dim("(absent)")),
        Some(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => {
                println!("  {} ({} bytes):", label, bytes.len());
                for line in text.lines().take(PREVIEW_LINES) {
                    println!("    {}", line);
                }
                if text.lines().count() > PREVIEW_LINES {
                    println!("    {}", style::dim("..."));
                }
            }
            Err(_) => {
                let summary = format!("<{} bytes binary>", bytes.len());
                println!("  {}: {}", label, style::dim(&summary));
            }
        },
    }
}

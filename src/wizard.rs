//! Three-step wizard gate: Details → Selection → Upload.
//!
//! Each gate validates its inputs before unlocking the next step; there is no
//! backward transition, and a completed step's data is frozen. Passing the
//! Selection gate builds the upload queue; the wizard then hands
//! `(UserDetails, UploadQueue)` to the driver exactly once.

use crate::error::{ValidationError, MAX_NAME_LEN, MAX_RESOURCES_NAME_LEN, MAX_SELECTIONS};
use crate::model::{ArtifactType, Branch, UserDetails};
use crate::queue::{build_queue, UploadQueue};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Details,
    Selection,
    Upload,
}

/// Raw inputs for the Details gate. `branch: None` models the "Select Branch"
/// placeholder still being shown.
#[derive(Debug, Clone, Default)]
pub struct DetailsInput {
    pub name: String,
    pub branch: Option<Branch>,
    pub year: String,
}

/// Raw inputs for the Selection gate. `sem: None` models the "Select SEM"
/// placeholder; subject and resources are selection tokens like any other
/// artifact type, but each requires its companion name field when present.
#[derive(Debug, Clone, Default)]
pub struct SelectionInput {
    pub sem: Option<String>,
    pub selections: BTreeSet<ArtifactType>,
    pub subject_name: Option<String>,
    pub resources_name: Option<String>,
}

#[derive(Debug, Clone)]
struct DetailsRecord {
    name: String,
    branch: Branch,
    year: String,
}

/// The wizard state machine. Transition methods consume validated input and
/// either advance the step or surface a `ValidationError` without advancing.
#[derive(Debug)]
pub struct Wizard {
    step: WizardStep,
    details: Option<DetailsRecord>,
    handoff: Option<(UserDetails, UploadQueue)>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Details,
            details: None,
            handoff: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Details → Selection. Requires a letters-only name of at most
    /// `MAX_NAME_LEN` characters and a real branch choice. The stored name is
    /// normalized to first-upper rest-lower, matching the portal's display
    /// form.
    pub fn submit_details(&mut self, input: DetailsInput) -> Result<(), ValidationError> {
        if self.step != WizardStep::Details {
            return Err(ValidationError::StepNotOpen);
        }
        let name = normalize_name(&input.name)?;
        let branch = input.branch.ok_or(ValidationError::BranchNotSelected)?;
        self.details = Some(DetailsRecord {
            name,
            branch,
            year: input.year.trim().to_string(),
        });
        self.step = WizardStep::Selection;
        Ok(())
    }

    /// Selection → Upload. Validates the semester, the selection set
    /// (non-empty, at most `MAX_SELECTIONS`), and the companion name fields
    /// for subject/resources tokens, then builds the queue and freezes the
    /// step.
    pub fn submit_selection(&mut self, input: SelectionInput) -> Result<(), ValidationError> {
        if self.step != WizardStep::Selection {
            return Err(ValidationError::StepNotOpen);
        }

        let sem = input
            .sem
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::SemNotSelected)?
            .to_string();

        if input.selections.is_empty() {
            return Err(ValidationError::NoArtifactSelected);
        }
        if input.selections.len() > MAX_SELECTIONS {
            return Err(ValidationError::TooManySelections(input.selections.len()));
        }

        let subject_name = if input.selections.contains(&ArtifactType::Subject) {
            Some(
                input
                    .subject_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(ValidationError::MissingSubjectName)?
                    .to_string(),
            )
        } else {
            None
        };

        let resources_name = if input.selections.contains(&ArtifactType::Resources) {
            Some(validate_resources_name(input.resources_name.as_deref())?)
        } else {
            None
        };

        // Details are present whenever we are past the Details gate.
        let record = self
            .details
            .as_ref()
            .expect("selection gate reached without details");

        let details = UserDetails {
            name: record.name.clone(),
            branch: record.branch,
            year: record.year.clone(),
            sem,
            subject_name,
            resources_name,
        };
        let queue = build_queue(&input.selections);
        self.handoff = Some((details, queue));
        self.step = WizardStep::Upload;
        Ok(())
    }

    /// Consume the wizard and yield the driver handoff. `None` until the
    /// Selection gate has passed; the one-shot ownership transfer is the
    /// guarantee that the driver receives the queue exactly once.
    pub fn into_handoff(self) -> Option<(UserDetails, UploadQueue)> {
        self.handoff
    }
}

fn normalize_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::NameNotLetters);
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    let mut chars = trimmed.chars();
    let first = chars.next().unwrap_or_default().to_ascii_uppercase();
    let rest: String = chars.map(|c| c.to_ascii_lowercase()).collect();
    Ok(format!("{first}{rest}"))
}

fn validate_resources_name(raw: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingResourcesName);
    }
    let allowed =
        |c: char| c.is_ascii_alphanumeric() || c == ' ' || c == '.' || c == '_' || c == '-';
    if !trimmed.chars().all(allowed) {
        return Err(ValidationError::InvalidResourcesName);
    }
    if trimmed.len() > MAX_RESOURCES_NAME_LEN {
        return Err(ValidationError::ResourcesNameTooLong);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactType::*;

    fn details_input() -> DetailsInput {
        DetailsInput {
            name: "alice".into(),
            branch: Some(Branch::Cse),
            year: "2024".into(),
        }
    }

    fn selection_input(selections: &[ArtifactType]) -> SelectionInput {
        SelectionInput {
            sem: Some("5".into()),
            selections: selections.iter().copied().collect(),
            subject_name: Some("Data Structures".into()),
            resources_name: Some("Midterm".into()),
        }
    }

    #[test]
    fn details_gate_requires_name_and_branch() {
        let mut wizard = Wizard::new();
        let err = wizard
            .submit_details(DetailsInput {
                name: "  ".into(),
                branch: Some(Branch::It),
                year: "2024".into(),
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingName);
        assert_eq!(wizard.step(), WizardStep::Details);

        let err = wizard
            .submit_details(DetailsInput {
                name: "alice".into(),
                branch: None,
                year: "2024".into(),
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::BranchNotSelected);
        assert_eq!(wizard.step(), WizardStep::Details);
    }

    #[test]
    fn details_gate_rejects_invalid_names() {
        let mut wizard = Wizard::new();
        let bad = DetailsInput {
            name: "alice42".into(),
            ..details_input()
        };
        assert_eq!(
            wizard.submit_details(bad).unwrap_err(),
            ValidationError::NameNotLetters
        );

        let long = DetailsInput {
            name: "a".repeat(21),
            ..details_input()
        };
        assert_eq!(
            wizard.submit_details(long).unwrap_err(),
            ValidationError::NameTooLong
        );
    }

    #[test]
    fn details_are_normalized_and_frozen() {
        let mut wizard = Wizard::new();
        wizard
            .submit_details(DetailsInput {
                name: "aLICE".into(),
                ..details_input()
            })
            .unwrap();
        assert_eq!(wizard.step(), WizardStep::Selection);

        // The completed step no longer accepts input.
        assert_eq!(
            wizard.submit_details(details_input()).unwrap_err(),
            ValidationError::StepNotOpen
        );

        wizard.submit_selection(selection_input(&[Ese])).unwrap();
        let (details, _) = wizard.into_handoff().unwrap();
        assert_eq!(details.name, "Alice");
    }

    #[test]
    fn selection_gate_requires_sem() {
        let mut wizard = Wizard::new();
        wizard.submit_details(details_input()).unwrap();
        let input = SelectionInput {
            sem: None,
            ..selection_input(&[Ese])
        };
        assert_eq!(
            wizard.submit_selection(input).unwrap_err(),
            ValidationError::SemNotSelected
        );
        // Step 3 stays unreachable.
        assert_eq!(wizard.step(), WizardStep::Selection);
        assert!(wizard.into_handoff().is_none());
    }

    #[test]
    fn selection_gate_requires_companion_names() {
        let mut wizard = Wizard::new();
        wizard.submit_details(details_input()).unwrap();

        let input = SelectionInput {
            subject_name: None,
            ..selection_input(&[Subject])
        };
        assert_eq!(
            wizard.submit_selection(input).unwrap_err(),
            ValidationError::MissingSubjectName
        );

        let input = SelectionInput {
            resources_name: Some("  ".into()),
            ..selection_input(&[Resources])
        };
        assert_eq!(
            wizard.submit_selection(input).unwrap_err(),
            ValidationError::MissingResourcesName
        );

        let input = SelectionInput {
            resources_name: Some("bad/name".into()),
            ..selection_input(&[Resources])
        };
        assert_eq!(
            wizard.submit_selection(input).unwrap_err(),
            ValidationError::InvalidResourcesName
        );
    }

    #[test]
    fn selection_gate_bounds_the_set_size() {
        let mut wizard = Wizard::new();
        wizard.submit_details(details_input()).unwrap();

        assert_eq!(
            wizard.submit_selection(selection_input(&[])).unwrap_err(),
            ValidationError::NoArtifactSelected
        );

        // The limit is a uniform "set size <= 3", tokens included.
        let input = selection_input(&[Resources, Subject, Ese, Ise1]);
        assert_eq!(
            wizard.submit_selection(input).unwrap_err(),
            ValidationError::TooManySelections(4)
        );

        wizard
            .submit_selection(selection_input(&[Resources, Subject, Ese]))
            .unwrap();
        assert_eq!(wizard.step(), WizardStep::Upload);
    }

    #[test]
    fn handoff_carries_queue_in_canonical_order() {
        let mut wizard = Wizard::new();
        wizard.submit_details(details_input()).unwrap();
        wizard
            .submit_selection(selection_input(&[Combined, Resources]))
            .unwrap();

        let (details, queue) = wizard.into_handoff().unwrap();
        assert_eq!(details.sem, "5");
        assert_eq!(details.resources_name.as_deref(), Some("Midterm"));
        // Subject was not selected, so its name field is not recorded.
        assert_eq!(details.subject_name, None);
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![Resources, Combined]);
    }

    #[test]
    fn selection_gate_closed_until_details_pass() {
        let mut wizard = Wizard::new();
        assert_eq!(
            wizard
                .submit_selection(selection_input(&[Ese]))
                .unwrap_err(),
            ValidationError::StepNotOpen
        );
    }
}

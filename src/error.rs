use thiserror::Error;

use crate::host::ObjectId;
use crate::palette::TemplateId;

/// Failures reported by a host implementation.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown template `{0}`")]
    UnknownTemplate(TemplateId),
    #[error("object {0} does not exist")]
    UnknownObject(ObjectId),
}

/// Recoverable failures of a single painting step.
///
/// None of these abort the tool: the interaction layer logs them and turns the
/// current event into a no-op.
#[derive(Debug, Error)]
pub enum PaintError {
    #[error("no template is selected in the active palette")]
    NoSelection,
    #[error("no surface under the cursor")]
    NoSurface,
    #[error("failed to instantiate template `{template}`")]
    Instantiation {
        template: TemplateId,
        #[source]
        source: HostError,
    },
}

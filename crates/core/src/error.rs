use crate::ActionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("combo dependency cycle through {0:?}")]
    ComboCycle(ActionId),
    #[error("duplicate catalog entry for {0:?}")]
    DuplicateAction(ActionId),
    #[error("missing catalog entry for {0:?}")]
    MissingAction(ActionId),
}

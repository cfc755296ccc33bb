pub mod history;
pub mod input;
pub mod interaction;
pub mod library;
pub mod persist;
pub mod pipeline;
pub mod shortcuts;
pub mod store;

pub use history::HistoryManager;
pub use input::{InputEvent, Modifiers, PointerButton};
pub use interaction::{InteractionController, Mode};
pub use library::{AssetRecord, Library, WorkflowRecord};
pub use persist::{AutoSaver, FsStorage, MemoryStorage, PersistError, Persistence, Storage};
pub use pipeline::{GenerationError, GenerationRequest, GenerationService, MediaResult};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{CanvasMutation, CanvasStore, Selection};

pub mod filter;
pub mod image;
pub mod recipe;
pub mod user;
pub mod validation;

pub use filter::{parse_id_list, RecipeFilter};
pub use image::{recipe_image_path, validate_image, ImageError, ValidatedImage, MAX_FILE_SIZE};
pub use recipe::{dedupe_names, LabelKind, RecipeChanges, RecipeDraft};
pub use user::{normalize_email, AccountError, NewAccount};
pub use validation::FieldErrors;

//! Member-name to column-name conventions.

/// Maps a constructor parameter name to the column it is read from.
pub trait NameConvention: Send + Sync {
    fn convert(&self, name: &str) -> String;
}

/// `CreatedAt` -> `created_at`, `userId` -> `user_id`.
///
/// An underscore is inserted before an uppercase letter that follows a non-uppercase one,
/// so acronym runs stay together (`HTTPCode` -> `httpcode`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

impl NameConvention for SnakeCase {
    fn convert(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() * 2);
        let mut prev_upper = true;
        for (i, c) in name.chars().enumerate() {
            let upper = c.is_uppercase();
            if i > 0 && upper && !prev_upper {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_upper = upper;
        }
        out
    }
}

/// Uses member names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl NameConvention for Verbatim {
    fn convert(&self, name: &str) -> String {
        name.to_owned()
    }
}

impl<F> NameConvention for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn convert(&self, name: &str) -> String {
        self(name)
    }
}

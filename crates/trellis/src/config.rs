//! Grid configuration.
//!
//! Configuration is an explicit value passed to layer constructors rather
//! than an ambient registry, so two stacks in one process can be configured
//! independently and tests can construct layers without global setup.

/// Sizing defaults injected into the layers at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Default width of a column in pixels.
    pub default_column_width: u32,
    /// Default height of a row in pixels.
    pub default_row_height: u32,
    /// Smallest width a column can be resized to.
    pub min_column_width: u32,
    /// Smallest height a row can be resized to.
    pub min_row_height: u32,
    /// Width of the row-header column in pixels.
    pub row_header_width: u32,
    /// Height of a column-header row in pixels.
    pub column_header_height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_column_width: 100,
            default_row_height: 20,
            min_column_width: 5,
            min_row_height: 5,
            row_header_width: 40,
            column_header_height: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.default_column_width, 100);
        assert_eq!(config.default_row_height, 20);
        assert!(config.min_column_width <= config.default_column_width);
    }
}

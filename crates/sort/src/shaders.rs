//! WGSL programs for the sort stages, specialized per [`SortConfig`].

use compute::KernelSource;

use crate::config::SortConfig;

const COUNT_WGSL: &str = include_str!("shaders/radix_count.wgsl");
const CLEANUP_WGSL: &str = include_str!("shaders/radix_cleanup.wgsl");
const PREFIX_WGSL: &str = include_str!("shaders/radix_prefix.wgsl");
const SCATTER_WGSL: &str = include_str!("shaders/radix_scatter.wgsl");

/// Entry points, by program.
pub const COUNT_ENTRY: &str = "count_step";
pub const CLEANUP_ENTRY: &str = "cleanup";
pub const PREFIX_ENTRY: &str = "prefix_step";
pub const REDUCE_ENTRY: &str = "reduce_step";
pub const SCATTER_ENTRY: &str = "scatter";

/// The four sort programs with the configuration constants injected.
#[derive(Clone, Debug)]
pub struct RadixSources {
    pub count: KernelSource,
    pub cleanup: KernelSource,
    pub prefix: KernelSource,
    pub scatter: KernelSource,
}

impl RadixSources {
    pub fn new(config: &SortConfig) -> Self {
        Self {
            count: specialize("radix_count.wgsl", COUNT_WGSL, config),
            cleanup: specialize("radix_cleanup.wgsl", CLEANUP_WGSL, config),
            prefix: specialize("radix_prefix.wgsl", PREFIX_WGSL, config),
            scatter: specialize("radix_scatter.wgsl", SCATTER_WGSL, config),
        }
    }

    pub fn all(&self) -> [&KernelSource; 4] {
        [&self.count, &self.cleanup, &self.prefix, &self.scatter]
    }
}

fn specialize(name: &str, body: &'static str, config: &SortConfig) -> KernelSource {
    KernelSource::new(name, body)
        .define("WORKGROUP_SIZE", config.work_group_size)
        .define("BUCKET_COUNT", config.bucket_count())
        .define("DIGIT_MASK", config.digit_mask())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_follow_config() {
        let config = SortConfig {
            work_group_size: 256,
            digit_bits: 8,
        };
        let sources = RadixSources::new(&config);
        for source in sources.all() {
            let text = source.text();
            assert!(text.contains("const WORKGROUP_SIZE: u32 = 256u;"), "{}", source.name());
            assert!(text.contains("const BUCKET_COUNT: u32 = 256u;"));
            assert!(text.contains("const DIGIT_MASK: u32 = 255u;"));
        }
    }

    #[test]
    fn test_entry_points_present() {
        let sources = RadixSources::new(&SortConfig::default());
        assert!(sources.count.text().contains(&format!("fn {}(", COUNT_ENTRY)));
        assert!(sources.cleanup.text().contains(&format!("fn {}(", CLEANUP_ENTRY)));
        assert!(sources.prefix.text().contains(&format!("fn {}(", PREFIX_ENTRY)));
        assert!(sources.prefix.text().contains(&format!("fn {}(", REDUCE_ENTRY)));
        assert!(sources.scatter.text().contains(&format!("fn {}(", SCATTER_ENTRY)));
    }
}

//! Parse and validate every sort program with naga, for several
//! configurations, without needing a device.

use sort::shaders::RadixSources;
use sort::SortConfig;

fn validate(config: &SortConfig, errors: &mut Vec<String>) {
    for source in RadixSources::new(config).all() {
        let text = source.text();
        let module = match naga::front::wgsl::parse_str(&text) {
            Ok(module) => module,
            Err(e) => {
                errors.push(format!(
                    "Failed to parse {} ({:?}):\n{}",
                    source.name(),
                    config,
                    e.emit_to_string(&text)
                ));
                continue;
            }
        };

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        if let Err(e) = validator.validate(&module) {
            errors.push(format!("Failed to validate {} ({:?}):\n{:?}", source.name(), config, e));
        }
    }
}

#[test]
fn validate_all_sort_shaders() {
    let configs = [
        SortConfig::default(),
        SortConfig {
            work_group_size: 256,
            digit_bits: 8,
        },
        SortConfig {
            work_group_size: 32,
            digit_bits: 5,
        },
        SortConfig {
            work_group_size: 2,
            digit_bits: 1,
        },
    ];

    let mut errors = Vec::new();
    for config in &configs {
        assert!(config.validate().is_ok(), "{:?}", config);
        validate(config, &mut errors);
    }
    if !errors.is_empty() {
        panic!("Shader validation failed:\n{}", errors.join("\n"));
    }
}

#[test]
fn prefix_program_exposes_both_scan_steps() {
    let sources = RadixSources::new(&SortConfig::default());
    let text = sources.prefix.text();
    let module = naga::front::wgsl::parse_str(&text).expect("prefix program should parse");
    let names: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
    assert_eq!(names, vec!["prefix_step", "reduce_step"]);
}

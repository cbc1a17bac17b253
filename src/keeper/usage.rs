use crate::keeper::scanner::ObservedFile;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub models: u64,
    pub loras: u64,
    pub total: u64,
}

/// LoRA files are recognized by name: `_lora_` anywhere, or a `_lora.<ext>` suffix.
pub fn is_lora(name: &str, extension: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("_lora_") || lower.ends_with(&format!("_lora.{}", extension.to_lowercase()))
}

pub fn model_usage(files: &[ObservedFile], extension: &str) -> ModelUsage {
    let mut usage = ModelUsage::default();
    for file in files {
        if is_lora(&file.name, extension) {
            usage.loras += file.size;
        } else {
            usage.models += file.size;
        }
        usage.total += file.size;
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> ObservedFile {
        ObservedFile {
            name: name.to_string(),
            size,
        }
    }

    #[test]
    fn loras_are_split_from_models_by_name() {
        let files = vec![
            file("sdxl_base_f16.ckpt", 1000),
            file("detail_lora_f16.ckpt", 30),
            file("Style_LoRA.ckpt", 20),
            file("floral.ckpt", 5),
        ];
        let usage = model_usage(&files, "ckpt");
        assert_eq!(
            usage,
            ModelUsage {
                models: 1005,
                loras: 50,
                total: 1055
            }
        );
    }

    #[test]
    fn lora_substring_without_underscores_is_a_model() {
        assert!(!is_lora("floraflow.ckpt", "ckpt"));
        assert!(is_lora("x_lora.ckpt", "ckpt"));
    }
}

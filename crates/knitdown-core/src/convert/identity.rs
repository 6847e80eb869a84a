/*
 * convert/identity.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Converter that copies its input.
 */

use knitdown_system_runtime::SystemRuntime;

use super::{ConversionError, ConversionRequest, Converter, ConverterVersion, MIN_PANDOC_VERSION};

/// Writes the input text to the output path unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityConverter;

impl Converter for IdentityConverter {
    fn name(&self) -> &str {
        "identity"
    }

    fn version(&self, _runtime: &dyn SystemRuntime) -> Result<ConverterVersion, ConversionError> {
        Ok(MIN_PANDOC_VERSION)
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Result<(), ConversionError> {
        let text = request.runtime.file_read(request.input)?;
        request.runtime.file_write(request.output, &text)?;
        Ok(())
    }
}

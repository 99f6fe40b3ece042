pub mod html_transformer;
pub mod salutation;
pub mod template_pipeline;
pub mod text_normalizer;

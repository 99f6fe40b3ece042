pub mod use_cases;

pub use use_cases::template_pipeline::TemplatePipelineUseCase;

pub mod phone_pipeline;

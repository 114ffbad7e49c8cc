pub mod compile;
pub mod compile_error;
pub mod ir;
pub mod listing;
pub mod translator;

pub use compile::{Analysis, CancelFlag, Compilation, CompileOptions, Compiler};
pub use compile_error::CompileError;
pub use ir::{EmittedBlock, EmittedProgram};
pub use translator::{
    EchoTranslator, ProgramContext, TranslateError, Translation, TranslationRequest, Translator,
};

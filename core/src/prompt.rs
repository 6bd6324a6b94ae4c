//! Diagnosis prompt construction.

use crate::catalog::FunctionCatalog;
use crate::client::Message;
use crate::config::DiagnosticContext;

const CHINESE_SUFFIX: &str =
    "Please reply in Chinese to help analyze the cause of the error and solve it!";
const ENGLISH_SUFFIX: &str = "Please help analyze the cause of the error and solve it!";

/// Builds the failure description sent ahead of any conversation
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder<'a> {
    ctx: &'a DiagnosticContext,
}

impl<'a> PromptBuilder<'a> {
    pub const fn new(ctx: &'a DiagnosticContext) -> Self {
        Self { ctx }
    }

    /// Failure text, stack, source listing and the reply instruction
    pub fn build(&self, message: &str, stack: &str, catalog: &FunctionCatalog) -> String {
        let mut prompt = String::new();
        prompt.push_str("The following error occurred in the current program: \n```\n");
        prompt.push_str(message);
        prompt.push_str("\n```\n\n");

        prompt.push_str("Here is its call stack: \n```\n");
        prompt.push_str(stack);
        if !stack.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str("```\n\n");

        prompt.push_str("The source code list is as follows:\n");
        prompt.push_str(&catalog.render(self.ctx));
        prompt.push('\n');

        prompt.push_str(if self.ctx.session.use_chinese_output {
            CHINESE_SUFFIX
        } else {
            ENGLISH_SUFFIX
        });
        prompt
    }

    /// Console mode: the prompt is the only user turn
    pub fn console_messages(&self, message: &str, stack: &str, catalog: &FunctionCatalog) -> Vec<Message> {
        vec![Message::user(self.build(message, stack, catalog))]
    }

    /// Web mode: the prompt becomes the system turn ahead of the conversation
    pub fn web_messages(
        &self,
        message: &str,
        stack: &str,
        catalog: &FunctionCatalog,
        conversation: Vec<Message>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.build(message, stack, catalog)));
        messages.extend(conversation);
        messages
    }
}

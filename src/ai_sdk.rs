mod openai;

pub(crate) use openai::{
    first_choice_text, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};

use station_llm_sdk::client::LlmClient;
use station_llm_sdk::ollama::OllamaClient;

#[test]
fn test_all_clients_implement_trait() {
    fn assert_implements_trait<T: LlmClient>() {}

    assert_implements_trait::<OllamaClient>();
}

#[test]
fn test_trait_object_usage() {
    let _client: Box<dyn LlmClient> = Box::new(OllamaClient::new().unwrap());
}

#[test]
fn test_provider_and_model_names() {
    let client = OllamaClient::new().unwrap();
    assert_eq!(client.provider_name(), "ollama");
    assert_eq!(client.model_name(), "deepseek-r1:32b");
    assert_eq!(client.base_url(), "http://localhost:11434");

    let client = OllamaClient::new()
        .unwrap()
        .with_base_url("http://ollama.internal:11434/")
        .with_model("llama3:8b");
    assert_eq!(client.model_name(), "llama3:8b");
    assert_eq!(client.base_url(), "http://ollama.internal:11434");
}

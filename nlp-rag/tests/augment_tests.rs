mod common;

use std::sync::Arc;

use common::{RecordingGenerator, TableEmbedder};
use nlp_rag::{Augmenter, DocumentInput, InMemoryVectorStore, RagError, RagPipeline};

fn pipeline() -> Arc<RagPipeline> {
    Arc::new(
        RagPipeline::builder()
            .embedding_provider(Arc::new(TableEmbedder::new()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn retrieved_documents_are_added_as_context() {
    let pipeline = pipeline();
    pipeline
        .ingest(&[
            DocumentInput::new("a", "cats are mammals"),
            DocumentInput::new("b", "dogs are mammals"),
        ])
        .await
        .unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let augmenter = Augmenter::new(pipeline, generator.clone());

    let response = augmenter.augment("Classify", "what is a cat", 5).await.unwrap();
    assert!(response.starts_with("generated for"));

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.starts_with("Classify (with the following context):\nUser Query: what is a cat"));
    assert!(prompt.contains("cats are mammals"));
    assert!(prompt.contains("dogs are mammals"));
}

#[tokio::test]
async fn empty_store_sends_prompt_without_context() {
    let generator = Arc::new(RecordingGenerator::default());
    let augmenter = Augmenter::new(pipeline(), generator.clone());

    augmenter.augment("Summarize", "the weather", 3).await.unwrap();
    assert_eq!(generator.last_prompt().as_deref(), Some("Summarize: the weather"));
}

#[tokio::test]
async fn top_k_limits_context_documents() {
    let pipeline = pipeline();
    let docs: Vec<DocumentInput> =
        (0..6).map(|i| DocumentInput::new(format!("d{i}"), format!("doc{i}"))).collect();
    pipeline.ingest(&docs).await.unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let augmenter = Augmenter::new(pipeline, generator);

    let prompt = augmenter.build_prompt("Explain", "docs", 2).await;
    let (_, documents) = prompt.split_once("Relevant Documents:\n").unwrap();
    assert_eq!(documents.split("\n\n").count(), 2);
}

#[tokio::test]
async fn generator_failure_propagates() {
    let generator = Arc::new(RecordingGenerator { fail: true, ..Default::default() });
    let augmenter = Augmenter::new(pipeline(), generator.clone());

    let err = augmenter.augment("Summarize", "anything", 5).await.unwrap_err();
    assert!(matches!(err, RagError::Generation { .. }));
    assert_eq!(generator.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn context_failure_retries_with_direct_prompt() {
    let pipeline = pipeline();
    pipeline.ingest(&[DocumentInput::new("a", "cats are mammals")]).await.unwrap();
    let generator = Arc::new(RecordingGenerator { fail_with_context: true, ..Default::default() });
    let augmenter = Augmenter::new(pipeline, generator.clone());

    let response = augmenter.augment("Classify", "what is a cat", 5).await.unwrap();
    assert!(response.starts_with("generated for"));

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Relevant Documents:\ncats are mammals"));
    assert_eq!(prompts[1], "Classify: what is a cat");
}

#[tokio::test]
async fn direct_retry_failure_propagates() {
    let pipeline = pipeline();
    pipeline.ingest(&[DocumentInput::new("a", "cats are mammals")]).await.unwrap();
    let generator = Arc::new(RecordingGenerator { fail: true, ..Default::default() });
    let augmenter = Augmenter::new(pipeline, generator.clone());

    let err = augmenter.augment("Classify", "what is a cat", 5).await.unwrap_err();
    assert!(matches!(err, RagError::Generation { .. }));
    assert_eq!(generator.prompts.lock().unwrap().len(), 2);
}

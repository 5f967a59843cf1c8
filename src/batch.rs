use crate::{
    models::{BatchPage, BatchReport, BatchResult},
    pipeline::IllustrationPipeline,
    storage::filename,
};
use futures::future::join_all;
use std::sync::Arc;

/// Illustrates many pages in fixed-size chunks.
///
/// Chunks run strictly one after another with `batch_delay` between them;
/// pages inside a chunk run concurrently on their own tasks, so a failing
/// or panicking page only affects its own [`BatchResult`].
pub struct BatchOrchestrator {
    pipeline: Arc<IllustrationPipeline>,
}

impl BatchOrchestrator {
    pub fn new(pipeline: Arc<IllustrationPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, book_id: &str, pages: Vec<BatchPage>, batch_size: usize) -> BatchReport {
        let config = self.pipeline.config();
        let chunk_size = config.clamp_batch_size(Some(batch_size));
        let total_chunks = pages.len().div_ceil(chunk_size);

        log::info!(
            "📚 Illustrating {} page(s) for book {} in {} chunk(s) of up to {}",
            pages.len(),
            book_id,
            total_chunks,
            chunk_size
        );

        let mut outcomes = Vec::with_capacity(pages.len());
        for (chunk_index, chunk) in pages.chunks(chunk_size).enumerate() {
            if chunk_index > 0 && !config.batch_delay.is_zero() {
                tokio::time::sleep(config.batch_delay).await;
            }
            log::info!("📦 Chunk {}/{} ({} page(s))", chunk_index + 1, total_chunks, chunk.len());

            let handles: Vec<_> = chunk
                .iter()
                .cloned()
                .map(|page| {
                    let pipeline = self.pipeline.clone();
                    let book_id = book_id.to_string();
                    let page_index = page.page_index;
                    let handle = tokio::spawn(async move {
                        let name = filename::batch(&book_id, page.page_index);
                        pipeline.illustrate(&page.request, &name).await
                    });
                    (page_index, handle)
                })
                .collect();

            let settled = join_all(handles.into_iter().map(|(page_index, handle)| async move {
                match handle.await {
                    Ok(Ok(stored)) => BatchResult::succeeded(page_index, stored.url),
                    Ok(Err(e)) => BatchResult::failed(page_index, e.to_string()),
                    Err(join_error) => {
                        log::error!("❌ Page {} task aborted: {}", page_index, join_error);
                        BatchResult::failed(page_index, format!("page task aborted: {}", join_error))
                    }
                }
            }))
            .await;
            outcomes.extend(settled);
        }

        let report = BatchReport::from_results(outcomes);
        log::info!(
            "📊 Book {}: {}/{} page(s) illustrated ({:.0}%)",
            book_id,
            report.summary.successful,
            report.summary.total_pages,
            report.summary.success_rate * 100.0
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::error::{IllustrationError, Result};
    use crate::gemini::GenerationClient;
    use crate::models::{GenerationResponse, IllustrationRequest, ResponsePart};
    use crate::pipeline::tests::{MemorySink, PNG_B64};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks peak concurrency; fails pages whose prompt carries a marker.
    struct PagedGenerator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl PagedGenerator {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for PagedGenerator {
        async fn generate(&self, _model_id: &str, prompt: &str) -> Result<GenerationResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if prompt.contains("[fail]") {
                return Err(IllustrationError::ResponseError("model overloaded".into()));
            }
            if prompt.contains("[empty]") {
                return Ok(GenerationResponse::default());
            }
            if prompt.contains("[panic]") {
                panic!("generator bug");
            }
            Ok(GenerationResponse::from_parts(vec![ResponsePart::inline("image/png", PNG_B64)]))
        }
    }

    fn orchestrator(generator: Arc<PagedGenerator>, delay: Duration) -> BatchOrchestrator {
        let config = PipelineConfig::default().with_batch_delay(delay);
        let pipeline = IllustrationPipeline::new(generator, Arc::new(MemorySink::new()), "test-model", config);
        BatchOrchestrator::new(Arc::new(pipeline))
    }

    fn pages(n: usize, marker: impl Fn(usize) -> &'static str) -> Vec<BatchPage> {
        (0..n)
            .map(|i| BatchPage {
                page_index: i,
                request: IllustrationRequest::new(format!("Page {} {}", i, marker(i))).unwrap(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_every_page_reported_once() {
        for (n, b) in [(0, 3), (1, 1), (7, 3), (10, 5), (4, 4), (6, 1)] {
            let report = orchestrator(Arc::new(PagedGenerator::new()), Duration::ZERO)
                .run("book", pages(n, |_| ""), b)
                .await;

            let indices: Vec<_> = report.outcomes().iter().map(|r| r.page_index).collect();
            assert_eq!(indices, (0..n).collect::<Vec<_>>(), "n={} b={}", n, b);
            assert_eq!(report.summary.successful + report.summary.failed, n);
            assert_eq!(report.summary.total_pages, n);
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let baseline = orchestrator(Arc::new(PagedGenerator::new()), Duration::ZERO)
            .run("book", pages(6, |_| ""), 3)
            .await;
        let injected = orchestrator(Arc::new(PagedGenerator::new()), Duration::ZERO)
            .run("book", pages(6, |i| if i == 4 { "[fail]" } else { "" }), 3)
            .await;

        assert_eq!(baseline.summary.successful, 6);
        assert_eq!(injected.summary.successful, 5);
        assert_eq!(injected.failed_results.len(), 1);
        assert_eq!(injected.failed_results[0].page_index, 4);
        assert!(injected.failed_results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("model overloaded"));

        for (before, after) in baseline.outcomes().iter().zip(injected.outcomes()) {
            if before.page_index == 4 {
                continue;
            }
            assert_eq!(before.success, after.success);
            assert_eq!(before.image_url.is_some(), after.image_url.is_some());
            let url = after.image_url.as_deref().unwrap();
            assert!(url.contains(&format!("_page{}_", after.page_index)));
        }
    }

    #[tokio::test]
    async fn test_mixed_failures_and_panics_are_captured() {
        let report = orchestrator(Arc::new(PagedGenerator::new()), Duration::ZERO)
            .run(
                "book",
                pages(5, |i| match i {
                    1 => "[empty]",
                    3 => "[panic]",
                    _ => "",
                }),
                2,
            )
            .await;

        let failed: Vec<_> = report.failed_results.iter().map(|r| r.page_index).collect();
        assert_eq!(failed, vec![1, 3]);
        assert_eq!(report.summary.successful, 3);
        assert!((report.summary.success_rate - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_batch_size() {
        let generator = Arc::new(PagedGenerator::new());
        orchestrator(generator.clone(), Duration::ZERO)
            .run("book", pages(9, |_| ""), 2)
            .await;
        assert!(generator.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_clamped() {
        let generator = Arc::new(PagedGenerator::new());
        let report = orchestrator(generator.clone(), Duration::ZERO)
            .run("book", pages(12, |_| ""), 50)
            .await;
        assert_eq!(report.summary.total_pages, 12);
        assert!(generator.peak.load(Ordering::SeqCst) <= PipelineConfig::default().max_batch_size);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_chunks() {
        let started = tokio::time::Instant::now();
        orchestrator(Arc::new(PagedGenerator::new()), Duration::from_secs(2))
            .run("book", pages(7, |_| ""), 3)
            .await;
        // three chunks, two pauses
        assert!(started.elapsed() >= Duration::from_secs(4));
    }
}

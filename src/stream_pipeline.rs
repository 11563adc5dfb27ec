// THEORY:
// `stream_pipeline` lets async code feed frames to the engine without sharing the
// background model between threads. The model is the one piece of mutable state
// that spans cycles, so exactly one worker owns it.
//
// Key architectural principles:
// 1.  **Single owner**: a `VisionPipeline` is moved into one blocking worker task.
//     Nothing else can reach it, so no lock is needed around update/delta.
// 2.  **Actor messaging**: callers send a `FrameTask` over a bounded channel and
//     await a oneshot reply. The bound gives natural back-pressure when the
//     producer outruns the analysis.
// 3.  **Strict order**: one queue, one worker. Frames are analysed in submission
//     order, which is what the running average requires.
// 4.  **Clean shutdown**: closing the queue ends the worker, which hands the
//     pipeline back so the caller can inspect the final state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use image::RgbImage;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::error::{Result, VisionError};
use crate::pipeline::{Report, VisionPipeline};

const FRAME_QUEUE_DEPTH: usize = 8;

/// A frame queued for analysis.
struct FrameBuffer {
    data: RgbImage,
    frame_id: u64,
    received: Instant,
}

/// A report together with its stream bookkeeping.
#[derive(Debug, Clone)]
pub struct TimedReport {
    /// Submission order of the frame, counting failed frames too.
    pub frame_id: u64,
    /// Time from submission to the end of analysis, queueing included.
    pub latency: Duration,
    pub report: Report,
}

struct FrameTask {
    frame_buffer: FrameBuffer,
    result_sender: oneshot::Sender<Result<TimedReport>>,
}

/// Async front end to a `VisionPipeline` running on its own worker.
pub struct StreamPipeline {
    task_sender: mpsc::Sender<FrameTask>,
    worker: JoinHandle<VisionPipeline>,
    frame_counter: AtomicU64,
}

impl StreamPipeline {
    /// Validates `config` and starts the worker. Must be called inside a Tokio runtime.
    pub fn spawn(config: PipelineConfig) -> Result<Self> {
        let pipeline = VisionPipeline::new(config)?;
        let (task_sender, task_receiver) = mpsc::channel::<FrameTask>(FRAME_QUEUE_DEPTH);
        let worker = tokio::task::spawn_blocking(move || Self::run_worker(pipeline, task_receiver));
        Ok(Self {
            task_sender,
            worker,
            frame_counter: AtomicU64::new(0),
        })
    }

    fn run_worker(
        mut pipeline: VisionPipeline,
        mut task_receiver: mpsc::Receiver<FrameTask>,
    ) -> VisionPipeline {
        while let Some(task) = task_receiver.blocking_recv() {
            let FrameBuffer {
                data,
                frame_id,
                received,
            } = task.frame_buffer;
            let result = pipeline.process_frame(&data).map(|report| TimedReport {
                frame_id,
                latency: received.elapsed(),
                report,
            });
            if let Err(e) = &result {
                log::warn!("frame {} rejected: {}", frame_id, e);
            }
            // The caller may have stopped waiting; that is not the worker's problem.
            let _ = task.result_sender.send(result);
        }
        log::debug!("stream worker stopped after {} frame(s)", pipeline.frames_processed());
        pipeline
    }

    /// Queues one frame and waits for its report.
    pub async fn process_frame(&self, frame: RgbImage) -> Result<TimedReport> {
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let (result_sender, result_receiver) = oneshot::channel();
        let task = FrameTask {
            frame_buffer: FrameBuffer {
                data: frame,
                frame_id,
                received: Instant::now(),
            },
            result_sender,
        };

        self.task_sender
            .send(task)
            .await
            .map_err(|_| VisionError::PipelineClosed)?;

        result_receiver
            .await
            .map_err(|_| VisionError::PipelineClosed)?
    }

    /// Analyses every frame of `frames`, in order, yielding one result per frame.
    pub fn process_stream<'a, S>(&'a self, frames: S) -> impl Stream<Item = Result<TimedReport>> + 'a
    where
        S: Stream<Item = RgbImage> + 'a,
    {
        frames.then(move |frame| self.process_frame(frame))
    }

    /// Number of frames submitted so far.
    pub fn frames_submitted(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Stops accepting frames, drains the queue and returns the pipeline.
    pub async fn shutdown(self) -> Result<VisionPipeline> {
        drop(self.task_sender);
        self.worker.await.map_err(|_| VisionError::PipelineClosed)
    }
}

use std::time::{Duration, Instant};
use ndarray::{Array, Ix4};
use crate::utils;

/// Raw inference entry point of one detection model.
///
/// The model itself is loaded and executed by the host; this crate only hands it a normalized
/// input tensor and receives the flat output tensor back.
pub trait InferenceBackend: Send + Sync {
    fn run(&self, input: &Array<f32, Ix4>) -> anyhow::Result<Vec<f32>>;
}

impl<F> InferenceBackend for F
where
    F: Fn(&Array<f32, Ix4>) -> anyhow::Result<Vec<f32>> + Send + Sync,
{
    fn run(&self, input: &Array<f32, Ix4>) -> anyhow::Result<Vec<f32>> {
        self(input)
    }
}

pub trait InferenceProcess {
    type Input;
    type Prepared;
    type Raw;
    type Output;

    /// Pre-process the input data.
    fn preprocess(&self, x: &Self::Input) -> anyhow::Result<Self::Prepared>;

    /// Executes the model(s) on the preprocessed data.
    fn inference(&self, x: &Self::Prepared) -> anyhow::Result<Self::Raw>;

    /// Post-process the model's output.
    fn postprocess(&self, raw: Self::Raw, prepared: &Self::Prepared, x: &Self::Input) -> anyhow::Result<Self::Output>;

    /// Receives the duration of each stage: 0 preprocess, 1 inference, 2 postprocess.
    fn record_time(&self, _stage: usize, _elapsed: Duration) {}

    /// Executes the full pipeline, timing every stage.
    fn forward(&self, x: &Self::Input, profile: bool) -> anyhow::Result<Self::Output> {
        let detect_time = Instant::now();
        let mut _detect_elapsed = detect_time.elapsed();

        let t_pre = Instant::now();
        let prepared = self.preprocess(x)?;
        let t_pre = t_pre.elapsed();
        self.record_time(0, t_pre);
        _detect_elapsed = utils::trace(false, "TIME", "Preprocessing input", detect_time, _detect_elapsed);

        let t_exe = Instant::now();
        let raw = self.inference(&prepared)?;
        let t_exe = t_exe.elapsed();
        self.record_time(1, t_exe);
        _detect_elapsed = utils::trace(false, "TIME", "Detection run", detect_time, _detect_elapsed);

        let t_post = Instant::now();
        let ys = self.postprocess(raw, &prepared, x)?;
        let t_post = t_post.elapsed();
        self.record_time(2, t_post);
        _detect_elapsed = utils::trace(false, "TIME", "Postprocessing", detect_time, _detect_elapsed);

        if profile {
            log::info!("> Preprocess: {t_pre:?} | Inference: {t_exe:?} | Postprocess: {t_post:?}");
        }

        Ok(ys)
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::error::AudioError;
use crate::models::format::FormatRequest;
use crate::processing::suppression::{
    apply_noise_suppression, apply_voice_suppression, SuppressionLevels,
};
use crate::traits::endpoint_device::EndpointDevice;

/// Suppression processor owning a device pair and the streaming hot path.
///
/// Generic over the platform backend via the `EndpointDevice` trait.
/// Data flow per buffer:
///
/// ```text
/// caller input → [input stage] → noise gate → voice gate → [output stage] → caller output
/// ```
///
/// `process_audio` is meant to run on a real-time audio callback thread:
/// it allocates nothing, takes no locks, and performs no I/O. Control
/// operations (start/stop, level changes) go through atomics and may be
/// issued from another thread via [`ProcessorHandle`] while the audio
/// thread owns the processor itself.
pub struct SuppressionProcessor<D: EndpointDevice> {
    input: D,
    output: Option<D>,

    // Stage buffers, sized once at open time from the input device's
    // requested frame and channel counts. Never resized afterwards.
    input_stage: Vec<f32>,
    output_stage: Vec<f32>,

    channels: u16,
    running: Arc<AtomicBool>,
    levels: Arc<SuppressionLevels>,
}

/// Cloneable control surface for a [`SuppressionProcessor`].
///
/// Holds only the shared atomics, so a control thread can flip the
/// running flag or adjust thresholds while the audio thread owns the
/// processor mutably. A threshold change lands between stage invocations
/// of the hot path, never mid-float.
#[derive(Debug, Clone)]
pub struct ProcessorHandle {
    running: Arc<AtomicBool>,
    levels: Arc<SuppressionLevels>,
}

impl<D: EndpointDevice> SuppressionProcessor<D> {
    /// Open the input endpoint (mandatory) and the output endpoint (if
    /// given), and size the stage buffers from the input device.
    ///
    /// Either device failure aborts the open; devices bound before the
    /// failing step are released on the way out. The processor starts in
    /// the stopped state.
    pub fn open(
        input_endpoint: &str,
        output_endpoint: Option<&str>,
        request: FormatRequest,
    ) -> Result<Self, AudioError> {
        request.validate().map_err(AudioError::InvalidRequest)?;

        let input = match D::open(input_endpoint, request) {
            Ok(device) => device,
            Err(e) => {
                log::error!("failed to open input device: {}", e);
                return Err(e);
            }
        };

        let output = match output_endpoint {
            Some(endpoint) => match D::open(endpoint, request) {
                Ok(device) => Some(device),
                Err(e) => {
                    log::error!("failed to open output device: {}", e);
                    return Err(e);
                }
            },
            None => None,
        };

        // Buffer capacity comes from the input device's requested format
        // only; the output device plays whatever the input side produces.
        let capacity = input.request().samples_per_buffer();
        let channels = input.channels();

        Ok(Self {
            input,
            output,
            input_stage: vec![0.0; capacity],
            output_stage: vec![0.0; capacity],
            channels,
            running: Arc::new(AtomicBool::new(false)),
            levels: Arc::new(SuppressionLevels::new()),
        })
    }

    /// Begin gating `process_audio` calls. Idempotent; starts no hardware
    /// stream — driving the native stream is the stream runner's job.
    pub fn start(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    /// Stop gating. Idempotent. Subsequent `process_audio` calls are
    /// silently dropped until the next `start`.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Set the noise threshold, clamped into `[0.0, 1.0]`.
    pub fn set_noise_suppression_level(&self, level: f32) {
        self.levels.set_noise(level);
    }

    /// Set the voice threshold, clamped into `[0.0, 1.0]`.
    pub fn set_voice_suppression_level(&self, level: f32) {
        self.levels.set_voice(level);
    }

    /// Control surface usable from another thread.
    pub fn handle(&self) -> ProcessorHandle {
        ProcessorHandle {
            running: Arc::clone(&self.running),
            levels: Arc::clone(&self.levels),
        }
    }

    pub fn input_device(&self) -> &D {
        &self.input
    }

    pub fn output_device(&self) -> Option<&D> {
        self.output.as_ref()
    }

    /// Interleaved channels per frame, fixed at open time.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Largest `num_frames` a single `process_audio` call may carry.
    pub fn frames_per_buffer(&self) -> usize {
        self.input_stage.len() / self.channels as usize
    }

    /// Run one buffer of interleaved samples through both suppression
    /// stages.
    ///
    /// While stopped this is a silent no-op: `output` is left untouched
    /// and `Ok(())` is returned. While running, `num_frames × channels`
    /// samples are copied from `input`, gated in place (noise stage, then
    /// voice stage, unconditionally), and copied out to `output`.
    ///
    /// Oversized frame counts and undersized slices are rejected with
    /// `AudioError::BoundsViolation` before any copy happens.
    pub fn process_audio(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        num_frames: usize,
    ) -> Result<(), AudioError> {
        if !self.running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let samples = num_frames * self.channels as usize;
        if samples > self.input_stage.len() {
            return Err(AudioError::BoundsViolation {
                requested: samples,
                capacity: self.input_stage.len(),
            });
        }
        if input.len() < samples {
            return Err(AudioError::BoundsViolation {
                requested: samples,
                capacity: input.len(),
            });
        }
        if output.len() < samples {
            return Err(AudioError::BoundsViolation {
                requested: samples,
                capacity: output.len(),
            });
        }

        self.input_stage[..samples].copy_from_slice(&input[..samples]);

        apply_noise_suppression(&mut self.input_stage[..samples], self.levels.noise());
        apply_voice_suppression(&mut self.input_stage[..samples], self.levels.voice());

        self.output_stage[..samples].copy_from_slice(&self.input_stage[..samples]);
        output[..samples].copy_from_slice(&self.output_stage[..samples]);

        Ok(())
    }
}

impl ProcessorHandle {
    pub fn start(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_noise_suppression_level(&self, level: f32) {
        self.levels.set_noise(level);
    }

    pub fn set_voice_suppression_level(&self, level: f32) {
        self.levels.set_voice(level);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::models::format::NegotiatedFormat;

    /// Test double standing in for a platform backend. The negotiated
    /// format deliberately disagrees with the request so accessor
    /// semantics stay honest.
    struct MockEndpoint {
        request: FormatRequest,
    }

    impl EndpointDevice for MockEndpoint {
        fn open(endpoint_id: &str, request: FormatRequest) -> Result<Self, AudioError> {
            if endpoint_id == "missing" {
                return Err(AudioError::EndpointResolution(endpoint_id.into()));
            }
            Ok(Self { request })
        }

        fn request(&self) -> FormatRequest {
            self.request
        }

        fn negotiated(&self) -> NegotiatedFormat {
            NegotiatedFormat {
                sample_rate: 48000,
                channels: 2,
                bits_per_sample: 32,
                is_float: true,
            }
        }
    }

    fn mono_processor() -> SuppressionProcessor<MockEndpoint> {
        SuppressionProcessor::open("mic", None, FormatRequest::default()).unwrap()
    }

    #[test]
    fn open_without_output_device() {
        let proc = mono_processor();
        assert!(proc.output_device().is_none());
        assert!(!proc.is_running());
    }

    #[test]
    fn open_propagates_input_device_failure() {
        let result =
            SuppressionProcessor::<MockEndpoint>::open("missing", None, FormatRequest::default());
        assert_eq!(
            result.err(),
            Some(AudioError::EndpointResolution("missing".into()))
        );
    }

    #[test]
    fn open_aborts_when_output_device_fails() {
        let result = SuppressionProcessor::<MockEndpoint>::open(
            "mic",
            Some("missing"),
            FormatRequest::default(),
        );
        assert!(matches!(
            result.err(),
            Some(AudioError::EndpointResolution(_))
        ));
    }

    #[test]
    fn open_rejects_invalid_request() {
        let request = FormatRequest {
            channels: 0,
            ..FormatRequest::default()
        };
        let result = SuppressionProcessor::<MockEndpoint>::open("mic", None, request);
        assert!(matches!(result.err(), Some(AudioError::InvalidRequest(_))));
    }

    #[test]
    fn accessors_report_requested_format() {
        let request = FormatRequest {
            sample_rate: 44100,
            channels: 1,
            frames_per_buffer: 256,
        };
        let proc = SuppressionProcessor::<MockEndpoint>::open("mic", None, request).unwrap();

        // The mock negotiates 48kHz stereo; the requested values win at
        // the accessor level and size the stage buffers.
        assert_eq!(proc.input_device().sample_rate(), 44100);
        assert_eq!(proc.input_device().channels(), 1);
        assert_eq!(proc.frames_per_buffer(), 256);
    }

    #[test]
    fn stopped_processor_drops_calls_without_writing() {
        let mut proc = mono_processor();
        let input = [0.3, 0.6, -0.7];
        let mut output = [9.0; 3];

        assert_eq!(proc.process_audio(&input, &mut output, 3), Ok(()));
        assert_eq!(output, [9.0; 3]);
    }

    #[test]
    fn worked_example_through_both_stages() {
        let mut proc = mono_processor();
        proc.start();

        let input = [0.3, 0.6, -0.7];
        let mut output = [0.0; 3];
        proc.process_audio(&input, &mut output, 3).unwrap();

        // noise stage: 0.3 → 0.03; voice stage: 0.6 → 0.3, -0.7 → -0.35.
        assert_relative_eq!(output[0], 0.03, epsilon = 1e-6);
        assert_relative_eq!(output[1], 0.3);
        assert_relative_eq!(output[2], -0.35);
    }

    #[test]
    fn stop_then_start_resumes_identically() {
        let mut proc = mono_processor();
        let input = [0.3, 0.6, -0.7];

        proc.start();
        let mut first = [0.0; 3];
        proc.process_audio(&input, &mut first, 3).unwrap();

        proc.stop();
        let mut silenced = [5.0; 3];
        proc.process_audio(&input, &mut silenced, 3).unwrap();
        assert_eq!(silenced, [5.0; 3]);

        proc.start();
        let mut second = [0.0; 3];
        proc.process_audio(&input, &mut second, 3).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let proc = mono_processor();
        proc.start();
        proc.start();
        assert!(proc.is_running());
        proc.stop();
        proc.stop();
        assert!(!proc.is_running());
    }

    #[test]
    fn oversized_frame_count_is_rejected() {
        let request = FormatRequest {
            frames_per_buffer: 4,
            ..FormatRequest::default()
        };
        let mut proc = SuppressionProcessor::<MockEndpoint>::open("mic", None, request).unwrap();
        proc.start();

        let input = [0.1; 8];
        let mut output = [0.0; 8];
        assert_eq!(
            proc.process_audio(&input, &mut output, 5),
            Err(AudioError::BoundsViolation {
                requested: 5,
                capacity: 4,
            })
        );
        // Nothing was copied out.
        assert_eq!(output, [0.0; 8]);
    }

    #[test]
    fn undersized_slices_are_rejected() {
        let mut proc = mono_processor();
        proc.start();

        let input = [0.1; 2];
        let mut output = [0.0; 8];
        assert!(matches!(
            proc.process_audio(&input, &mut output, 3),
            Err(AudioError::BoundsViolation { .. })
        ));

        let input = [0.1; 8];
        let mut short_output = [0.0; 2];
        assert!(matches!(
            proc.process_audio(&input, &mut short_output, 3),
            Err(AudioError::BoundsViolation { .. })
        ));
    }

    #[test]
    fn bounds_are_checked_per_call_not_per_slice() {
        // A frame count smaller than the slices is fine; only the implied
        // sample count matters.
        let mut proc = mono_processor();
        proc.start();

        let input = [0.6; 8];
        let mut output = [0.0; 8];
        proc.process_audio(&input, &mut output, 2).unwrap();

        assert_relative_eq!(output[0], 0.3);
        assert_relative_eq!(output[1], 0.3);
        // Frames beyond num_frames stay untouched.
        assert_relative_eq!(output[2], 0.0);
    }

    #[test]
    fn handle_controls_running_and_levels() {
        let mut proc = mono_processor();
        let handle = proc.handle();

        handle.start();
        assert!(proc.is_running());

        // Gate nothing: every magnitude clears a zero noise threshold and
        // stays under a full voice threshold.
        handle.set_noise_suppression_level(-1.0);
        handle.set_voice_suppression_level(2.0);

        let input = [0.3, 0.6, -0.7];
        let mut output = [0.0; 3];
        proc.process_audio(&input, &mut output, 3).unwrap();
        assert_eq!(output, input);

        handle.stop();
        assert!(!proc.is_running());
    }

    #[test]
    fn level_changes_apply_to_the_next_buffer() {
        let mut proc = mono_processor();
        proc.start();

        let input = [0.3];
        let mut output = [0.0];
        proc.process_audio(&input, &mut output, 1).unwrap();
        assert_relative_eq!(output[0], 0.03, epsilon = 1e-6);

        proc.set_noise_suppression_level(0.2);
        proc.process_audio(&input, &mut output, 1).unwrap();
        assert_relative_eq!(output[0], 0.3);
    }
}

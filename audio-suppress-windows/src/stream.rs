//! Streaming pump: drives a `SuppressionProcessor` from a WASAPI capture
//! endpoint on a dedicated thread.
//!
//! Capture packets are polled, chunked to the processor's buffer size,
//! run through both suppression stages, delivered to the registered
//! callback, and written to the output device's render service when an
//! output device is present.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use audio_suppress_core::models::error::AudioError;
use audio_suppress_core::processor::{ProcessorHandle, SuppressionProcessor};
use audio_suppress_core::traits::endpoint_device::{EndpointDevice, ProcessedAudioCallback};

use crate::wasapi_device::WasapiEndpointDevice;

type WasapiProcessor = SuppressionProcessor<WasapiEndpointDevice>;

/// Owns the pump thread for one processor.
///
/// The thread owns the processor while streaming; control-plane access
/// goes through the [`ProcessorHandle`] returned by `controls`. `stop`
/// joins the thread and hands the processor back.
pub struct StreamRunner {
    running: Arc<AtomicBool>,
    controls: ProcessorHandle,
    pump_handle: Mutex<Option<thread::JoinHandle<WasapiProcessor>>>,
}

impl StreamRunner {
    /// Move `processor` onto a new pump thread and start polling its
    /// input endpoint.
    ///
    /// The callback fires once per processed chunk on the pump thread —
    /// keep it minimal. Whether chunks are processed or silently dropped
    /// is still governed by the processor's own start/stop flag.
    pub fn spawn(
        processor: WasapiProcessor,
        callback: ProcessedAudioCallback,
    ) -> Result<Self, AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let controls = processor.handle();

        let thread_flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("wasapi-stream-pump".into())
            .spawn(move || {
                let mut processor = processor;
                if let Err(e) = pump_loop(&thread_flag, &mut processor, callback) {
                    log::error!("stream pump error: {}", e);
                }
                thread_flag.store(false, Ordering::SeqCst);
                processor
            })
            .map_err(|e| AudioError::StreamFailure(format!("failed to spawn pump thread: {}", e)))?;

        Ok(Self {
            running,
            controls,
            pump_handle: Mutex::new(Some(handle)),
        })
    }

    /// Control surface for the processor owned by the pump thread.
    pub fn controls(&self) -> ProcessorHandle {
        self.controls.clone()
    }

    /// Whether the pump thread is still alive.
    pub fn is_streaming(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the pump thread and take the processor back.
    ///
    /// Returns `None` if the runner was already stopped.
    pub fn stop(&self) -> Option<WasapiProcessor> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.pump_handle.lock().take()?;
        handle.join().ok()
    }
}

impl Drop for StreamRunner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Pump loop running on the dedicated thread.
///
/// Sequence:
/// 1. CoInitializeEx (MTA), uninitialized on exit
/// 2. Register with MMCSS for real-time priority
/// 3. Start the input (and output) audio clients
/// 4. Poll capture packets, chunk, process, deliver, render
/// 5. Stop the clients
fn pump_loop(
    running: &Arc<AtomicBool>,
    processor: &mut WasapiProcessor,
    callback: ProcessedAudioCallback,
) -> Result<(), AudioError> {
    unsafe {
        CoInitializeEx(None, COINIT_MULTITHREADED)
            .map_err(|e| AudioError::StreamFailure(format!("CoInitializeEx failed: {}", e)))?;
        let _com_guard = CoUninitializeGuard;

        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        let _mmcss_handle = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index);

        let channels = processor.channels();
        let capacity = processor.frames_per_buffer() * channels as usize;
        let sample_rate = processor.input_device().negotiated().sample_rate;

        // Clone the COM interfaces up front (AddRef) so the hot loop
        // never holds a borrow of the processor across process_audio.
        let input_client = processor.input_device().audio_client().clone();
        let capture = processor.input_device().capture_client().clone();
        let output_pair = processor
            .output_device()
            .map(|d| (d.audio_client().clone(), d.render_client().clone()));

        // Scratch buffers, allocated once; the loop itself allocates nothing.
        let silence = vec![0.0f32; capacity];
        let mut processed = vec![0.0f32; capacity];

        input_client
            .Start()
            .map_err(|e| AudioError::StreamFailure(format!("input Start failed: {}", e)))?;
        if let Some((ref out_client, _)) = output_pair {
            out_client
                .Start()
                .map_err(|e| AudioError::StreamFailure(format!("output Start failed: {}", e)))?;
        }

        let result = (|| -> Result<(), AudioError> {
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));

                let mut packet_length: u32 = 0;
                capture
                    .GetNextPacketSize(&mut packet_length)
                    .map_err(|e| stream_err("GetNextPacketSize", e))?;

                while packet_length > 0 {
                    let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                    let mut num_frames: u32 = 0;
                    let mut flags: u32 = 0;

                    capture
                        .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                        .map_err(|e| stream_err("GetBuffer", e))?;

                    if num_frames > 0 && !buffer_ptr.is_null() && processor.is_running() {
                        // The engine delivers Float32 in shared mode. Total
                        // sample count follows the endpoint's mix format.
                        let native_channels =
                            processor.input_device().negotiated().channels.max(1);
                        let total_samples = num_frames as usize * native_channels as usize;

                        let silent = flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0;

                        // Packets can exceed the stage buffers; feed them
                        // through in capacity-sized chunks. A trailing
                        // partial frame (possible when the requested
                        // channel count does not divide the packet) is
                        // dropped.
                        let mut offset = 0usize;
                        while offset < total_samples {
                            let chunk_len = (total_samples - offset).min(capacity);
                            let chunk: &[f32] = if silent {
                                &silence[..chunk_len]
                            } else {
                                std::slice::from_raw_parts(
                                    (buffer_ptr as *const f32).add(offset),
                                    chunk_len,
                                )
                            };
                            offset += chunk_len;

                            let frames = chunk.len() / channels as usize;
                            if frames == 0 {
                                continue;
                            }
                            let used = frames * channels as usize;

                            processor.process_audio(
                                &chunk[..used],
                                &mut processed[..used],
                                frames,
                            )?;

                            callback(&processed[..used], sample_rate, channels);

                            if let Some((ref out_client, ref render)) = output_pair {
                                write_render(out_client, render, &processed[..used], frames)?;
                            }
                        }
                    }

                    capture
                        .ReleaseBuffer(num_frames)
                        .map_err(|e| stream_err("ReleaseBuffer", e))?;

                    capture
                        .GetNextPacketSize(&mut packet_length)
                        .map_err(|e| stream_err("GetNextPacketSize", e))?;
                }
            }
            Ok(())
        })();

        let _ = input_client.Stop();
        if let Some((ref out_client, _)) = output_pair {
            let _ = out_client.Stop();
        }

        result
    }
}

/// Copy processed samples into the render endpoint's buffer, bounded by
/// the space the engine currently has free.
unsafe fn write_render(
    client: &IAudioClient,
    render: &IAudioRenderClient,
    samples: &[f32],
    frames: usize,
) -> Result<(), AudioError> {
    let buffer_size = client
        .GetBufferSize()
        .map_err(|e| stream_err("GetBufferSize", e))?;
    let padding = client
        .GetCurrentPadding()
        .map_err(|e| stream_err("GetCurrentPadding", e))?;

    let available = buffer_size.saturating_sub(padding) as usize;
    let write_frames = frames.min(available);
    if write_frames == 0 {
        return Ok(());
    }

    let channels = samples.len() / frames;
    let dst = render
        .GetBuffer(write_frames as u32)
        .map_err(|e| stream_err("render GetBuffer", e))?;
    std::ptr::copy_nonoverlapping(
        samples.as_ptr(),
        dst as *mut f32,
        write_frames * channels,
    );
    render
        .ReleaseBuffer(write_frames as u32, 0)
        .map_err(|e| stream_err("render ReleaseBuffer", e))?;

    Ok(())
}

fn stream_err(op: &str, e: windows::core::Error) -> AudioError {
    AudioError::StreamFailure(format!("{} failed: {}", op, e))
}

/// RAII guard to call CoUninitialize when dropped.
struct CoUninitializeGuard;

impl Drop for CoUninitializeGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

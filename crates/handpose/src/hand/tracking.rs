//! Frame-by-frame tracking of a single hand.

use nalgebra::Vector2;

use crate::{
    detection::ssd::{Anchors, PALM_DETECTOR},
    filter::{Filter, MovingAvg},
    image::{Frame, Resolution},
    nn::{expect_output, resample::Resampler, InferenceError, Model, Tensor},
    rect::RotatedRect,
    timer::StageTimer,
};

use super::{
    detection::{PalmDecoder, PalmDetection},
    landmark::{HandLandmarks, LandmarkDecoder, NUM_LANDMARKS},
    roi::HandRoi,
};

const PALM_NETWORK: &str = "palm detection";
const LANDMARK_NETWORK: &str = "hand landmark";

/// Configuration for a [`HandTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    input_resolution: Resolution,
    palm_window: usize,
    landmark_window: usize,
    flip_horizontal: bool,
    flip_vertical: bool,
}

impl TrackerOptions {
    /// Default number of ticks the palm detection is averaged over.
    pub const DEFAULT_PALM_WINDOW: usize = 3;

    /// Default number of ticks the landmarks are averaged over.
    pub const DEFAULT_LANDMARK_WINDOW: usize = 4;

    /// Sets the input resolution of both networks.
    ///
    /// The palm detector's anchor table is computed for this resolution, and has to match the
    /// number of boxes the network outputs.
    #[inline]
    pub fn input_resolution(mut self, resolution: Resolution) -> Self {
        self.input_resolution = resolution;
        self
    }

    /// Sets the number of ticks the palm detection is averaged over.
    #[inline]
    pub fn palm_window(mut self, ticks: usize) -> Self {
        self.palm_window = ticks;
        self
    }

    /// Sets the number of ticks the hand landmarks are averaged over.
    #[inline]
    pub fn landmark_window(mut self, ticks: usize) -> Self {
        self.landmark_window = ticks;
        self
    }

    /// Selects whether frames are flipped horizontally and/or vertically before they're fed to
    /// the networks.
    ///
    /// By default, both axes are flipped, which is the convention for mirrored front cameras.
    #[inline]
    pub fn flip(mut self, horizontal: bool, vertical: bool) -> Self {
        self.flip_horizontal = horizontal;
        self.flip_vertical = vertical;
        self
    }
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            input_resolution: Resolution::NETWORK_INPUT,
            palm_window: Self::DEFAULT_PALM_WINDOW,
            landmark_window: Self::DEFAULT_LANDMARK_WINDOW,
            flip_horizontal: true,
            flip_vertical: true,
        }
    }
}

/// The smoothed hand pose published after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandPose {
    palm: PalmDetection,
    roi: HandRoi,
    landmarks: HandLandmarks,
    palm_updated: bool,
    hand_present: bool,
}

impl HandPose {
    /// Returns the smoothed palm detection, normalized to the palm detector's input.
    #[inline]
    pub fn palm(&self) -> &PalmDetection {
        &self.palm
    }

    /// Returns the region the landmark network was run on, in frame pixels.
    #[inline]
    pub fn roi(&self) -> &HandRoi {
        &self.roi
    }

    /// Returns the smoothed hand landmarks, in frame pixels.
    #[inline]
    pub fn landmarks(&self) -> &HandLandmarks {
        &self.landmarks
    }

    /// Returns whether the palm detector found a palm in the last tick.
    ///
    /// If it didn't, the previous detection was reused.
    #[inline]
    pub fn palm_updated(&self) -> bool {
        self.palm_updated
    }

    /// Returns whether the landmark network reported a hand in the last tick.
    ///
    /// If it didn't, the previous landmarks were reused.
    #[inline]
    pub fn hand_present(&self) -> bool {
        self.hand_present
    }
}

/// Everything that persists from one tick to the next.
#[derive(Clone)]
struct HandState {
    palm_filter: MovingAvg<PalmDetection>,
    landmark_filter: MovingAvg<HandLandmarks>,
    pose: HandPose,
    initialized: bool,
}

impl HandState {
    fn new(options: &TrackerOptions) -> Self {
        Self {
            palm_filter: MovingAvg::new(options.palm_window),
            landmark_filter: MovingAvg::new(options.landmark_window),
            pose: HandPose::default(),
            initialized: false,
        }
    }
}

/// Runs palm detection and hand landmark estimation on a sequence of frames.
///
/// Every call to [`HandTracker::track`] is one tick: the palm detector runs on the whole frame,
/// a region around the (smoothed) palm is cut out and rotated upright, and the landmark network
/// runs on that region. When the palm detector finds nothing, or the landmark network reports that
/// there is no hand, the previously published (smoothed) result is fed to the smoothing filters
/// again, so the published pose freezes instead of jumping to zero.
pub struct HandTracker {
    options: TrackerOptions,
    palm_model: Box<dyn Model>,
    landmark_model: Box<dyn Model>,
    anchors: Anchors,
    resampler: Resampler,
    palm_input: Tensor,
    landmark_input: Tensor,
    palm_decoder: PalmDecoder,
    landmark_decoder: LandmarkDecoder,
    state: HandState,
    t_resample: StageTimer,
    t_palm_infer: StageTimer,
    t_palm_decode: StageTimer,
    t_landmark_infer: StageTimer,
    t_landmark_decode: StageTimer,
}

impl HandTracker {
    /// Creates a tracker running `palm_model` and `landmark_model`.
    ///
    /// The palm model must output box regressors as output #0 and scores as output #1. The
    /// landmark model must output 21 X/Y/Z triples as output #0 and the hand presence flag as
    /// output #1.
    ///
    /// Returns an error if `options` are invalid, or the anchor table for the configured input
    /// resolution doesn't match the palm detector's box count.
    pub fn new<P, L>(palm_model: P, landmark_model: L, options: TrackerOptions) -> anyhow::Result<Self>
    where
        P: Model + 'static,
        L: Model + 'static,
    {
        if options.palm_window == 0 || options.landmark_window == 0 {
            anyhow::bail!(
                "smoothing windows must be non-zero (palm: {}, landmarks: {})",
                options.palm_window,
                options.landmark_window,
            );
        }
        let input = options.input_resolution;
        if input.num_pixels() == 0 {
            anyhow::bail!("invalid network input resolution {}", input);
        }

        let anchors = Anchors::calculate(&PALM_DETECTOR, input);
        if anchors.anchor_count() != PALM_DETECTOR.num_boxes {
            anyhow::bail!(
                "anchor table for {} input has {} entries, but the palm detector outputs {} boxes",
                input,
                anchors.anchor_count(),
                PALM_DETECTOR.num_boxes,
            );
        }

        let mut resampler = Resampler::new(input);
        resampler.set_flip(options.flip_horizontal, options.flip_vertical);
        let shape = resampler.tensor_shape();

        log::debug!(
            "hand tracker: {} input, {} anchors, smoothing over {} (palm) and {} (landmarks) ticks",
            input,
            anchors.anchor_count(),
            options.palm_window,
            options.landmark_window,
        );

        Ok(Self {
            options,
            palm_model: Box::new(palm_model),
            landmark_model: Box::new(landmark_model),
            anchors,
            resampler,
            palm_input: Tensor::zeros(&shape),
            landmark_input: Tensor::zeros(&shape),
            palm_decoder: PalmDecoder::new(),
            landmark_decoder: LandmarkDecoder::new(),
            state: HandState::new(&options),
            t_resample: StageTimer::new("resample"),
            t_palm_infer: StageTimer::new("palm infer"),
            t_palm_decode: StageTimer::new("palm decode"),
            t_landmark_infer: StageTimer::new("landmark infer"),
            t_landmark_decode: StageTimer::new("landmark decode"),
        })
    }

    /// Gives access to the palm decoder, to adjust its thresholds.
    pub fn palm_decoder_mut(&mut self) -> &mut PalmDecoder {
        &mut self.palm_decoder
    }

    /// Gives access to the landmark decoder, to adjust its threshold.
    pub fn landmark_decoder_mut(&mut self) -> &mut LandmarkDecoder {
        &mut self.landmark_decoder
    }

    /// Returns the pose published by the last successful tick.
    ///
    /// Before the first tick, this is all zeroes.
    #[inline]
    pub fn pose(&self) -> &HandPose {
        &self.state.pose
    }

    /// Returns whether at least one tick has completed successfully.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    /// Returns profiling timers for the tracking stages.
    pub fn timers(&self) -> [&StageTimer; 5] {
        [
            &self.t_resample,
            &self.t_palm_infer,
            &self.t_palm_decode,
            &self.t_landmark_infer,
            &self.t_landmark_decode,
        ]
    }

    /// Forgets all smoothing history and previous results.
    pub fn reset(&mut self) {
        self.state = HandState::new(&self.options);
    }

    /// Runs one tick of the pipeline on `frame` and returns the updated pose.
    ///
    /// If either network fails, an [`InferenceError`] is returned and the tracker's state is left
    /// exactly as it was before the call.
    pub fn track(&mut self, frame: &Frame<'_>) -> Result<&HandPose, InferenceError> {
        // Work on a copy so that a failing network can't leave the filters half-updated.
        let mut state = self.state.clone();
        let input = self.resampler.target_resolution();

        let frame_size = Vector2::new(frame.width() as f32, frame.height() as f32);
        let full_frame = RotatedRect::new(frame_size * 0.5, frame_size, 0.0);
        self.t_resample.time(|| {
            self.resampler
                .resample_into(frame, &full_frame, &mut self.palm_input)
        });

        self.palm_model.set_input(&self.palm_input);
        self.t_palm_infer
            .time(|| self.palm_model.invoke())
            .map_err(|e| InferenceError::new(PALM_NETWORK, e))?;

        // Without a detection, the last published palm is smoothed again.
        let mut palm = state.pose.palm;
        let palm_updated = {
            let _guard = self.t_palm_decode.start();
            let num_boxes = self.anchors.anchor_count();
            let coords = self.palm_decoder.layout().coords_per_box();
            let boxes = expect_output(&*self.palm_model, 0, num_boxes * coords)
                .map_err(|e| InferenceError::new(PALM_NETWORK, e))?;
            let scores = expect_output(&*self.palm_model, 1, num_boxes)
                .map_err(|e| InferenceError::new(PALM_NETWORK, e))?;
            self.palm_decoder
                .decode(scores, boxes, &self.anchors, &mut palm)
        };

        // The region is derived from the smoothed palm, in network input pixels, and then mapped
        // back into the frame.
        let palm = state.palm_filter.push(palm);
        let roi = HandRoi::derive(&palm, input)
            .map_to_frame(&full_frame, &self.resampler.letterbox(&full_frame));

        self.t_resample.time(|| {
            self.resampler
                .resample_into(frame, &roi.rotated_rect(), &mut self.landmark_input)
        });

        self.landmark_model.set_input(&self.landmark_input);
        self.t_landmark_infer
            .time(|| self.landmark_model.invoke())
            .map_err(|e| InferenceError::new(LANDMARK_NETWORK, e))?;

        let mut landmarks = state.pose.landmarks;
        let hand_present = {
            let _guard = self.t_landmark_decode.start();
            let raw = expect_output(&*self.landmark_model, 0, NUM_LANDMARKS * 3)
                .map_err(|e| InferenceError::new(LANDMARK_NETWORK, e))?;
            let presence = expect_output(&*self.landmark_model, 1, 1)
                .map_err(|e| InferenceError::new(LANDMARK_NETWORK, e))?[0];
            log::trace!("hand presence: {}", presence);
            self.landmark_decoder
                .decode(raw, presence, &roi, input, &mut landmarks)
        };
        let landmarks = state.landmark_filter.push(landmarks);

        let previous = &self.state.pose;
        if !state.initialized || previous.palm_updated != palm_updated {
            log::debug!("palm {}", if palm_updated { "found" } else { "lost" });
        }
        if !state.initialized || previous.hand_present != hand_present {
            log::debug!("hand {}", if hand_present { "present" } else { "absent" });
        }

        state.pose = HandPose {
            palm,
            roi,
            landmarks,
            palm_updated,
            hand_present,
        };
        state.initialized = true;
        log::trace!(
            "roi: center={:?} size={:?} angle={:.1}deg",
            roi.center(),
            roi.size(),
            roi.angle().to_degrees(),
        );

        self.state = state;
        Ok(&self.state.pose)
    }
}

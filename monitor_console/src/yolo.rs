// THEORY:
// The detector is a YOLOv8 model exported to ONNX and run through OpenCV's DNN
// module. The engine only sees the `Detector` trait; everything model-specific
// (input size, output layout, class names, non-maximum suppression) stays here.
//
// YOLOv8 emits one tensor of shape [1, 4 + classes, candidates]. Column `i` holds
// the box center, width and height in input pixels followed by one score per
// class. There is no separate objectness score.

use hazard_vision::config::ComputeDevice;
use hazard_vision::error::DetectorError;
use hazard_vision::{BoundingBox, Detection, Detector};
use opencv::{
    core::{self, Mat, Rect, Scalar, Size, Vector},
    dnn,
    prelude::*,
};
use std::path::Path;
use tracing::info;

use crate::cv_frame::CvFrame;

const INPUT_SIZE: i32 = 640;
const CANDIDATE_SCORE_FLOOR: f32 = 0.25;
const NMS_IOU_THRESHOLD: f32 = 0.45;

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat", "traffic light",
    "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog", "horse", "sheep", "cow",
    "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove", "skateboard", "surfboard",
    "tennis racket", "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard",
    "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase",
    "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub struct YoloDetector {
    net: dnn::Net,
    output_names: Vector<String>,
}

fn detector_error(e: opencv::Error) -> DetectorError {
    DetectorError(e.to_string())
}

impl YoloDetector {
    pub fn load(model_path: &Path, device: ComputeDevice) -> Result<Self, DetectorError> {
        info!(model = %model_path.display(), ?device, "loading detection model");
        let path = model_path
            .to_str()
            .ok_or_else(|| DetectorError(format!("model path is not UTF-8: {}", model_path.display())))?;
        let mut net = dnn::read_net_from_onnx(path).map_err(detector_error)?;

        let (backend, target) = match device {
            ComputeDevice::Cpu => (dnn::DNN_BACKEND_OPENCV, dnn::DNN_TARGET_CPU),
            ComputeDevice::Cuda => (dnn::DNN_BACKEND_CUDA, dnn::DNN_TARGET_CUDA),
        };
        net.set_preferable_backend(backend).map_err(detector_error)?;
        net.set_preferable_target(target).map_err(detector_error)?;

        let output_names = net.get_unconnected_out_layers_names().map_err(detector_error)?;
        Ok(Self { net, output_names })
    }

    fn infer(&mut self, frame: &Mat) -> opencv::Result<Vec<Detection>> {
        let blob = dnn::blob_from_image(
            frame,
            1.0 / 255.0,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            Scalar::default(),
            true,
            false,
            core::CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;

        let mut outputs: Vector<Mat> = Vector::new();
        self.net.forward(&mut outputs, &self.output_names)?;
        let output = outputs.get(0)?;
        let data = output.data_typed::<f32>()?;

        let rows = 4 + COCO_CLASSES.len();
        let candidates = data.len() / rows;
        let scale_x = frame.cols() as f32 / INPUT_SIZE as f32;
        let scale_y = frame.rows() as f32 / INPUT_SIZE as f32;

        let mut boxes: Vector<Rect> = Vector::new();
        let mut scores: Vector<f32> = Vector::new();
        let mut classes = Vec::new();
        for i in 0..candidates {
            let at = |row: usize| data[row * candidates + i];
            let (class_id, score) = (0..COCO_CLASSES.len())
                .map(|c| (c, at(4 + c)))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
            if score < CANDIDATE_SCORE_FLOOR {
                continue;
            }

            let (cx, cy, w, h) = (at(0), at(1), at(2), at(3));
            boxes.push(Rect::new(
                ((cx - w / 2.0) * scale_x) as i32,
                ((cy - h / 2.0) * scale_y) as i32,
                (w * scale_x) as i32,
                (h * scale_y) as i32,
            ));
            scores.push(score);
            classes.push(class_id);
        }

        let mut keep: Vector<i32> = Vector::new();
        dnn::nms_boxes(&boxes, &scores, CANDIDATE_SCORE_FLOOR, NMS_IOU_THRESHOLD, &mut keep, 1.0, 0)?;

        let mut detections = Vec::with_capacity(keep.len());
        for index in keep {
            let index = index as usize;
            let rect = boxes.get(index)?;
            detections.push(Detection::new(
                COCO_CLASSES[classes[index]],
                scores.get(index)?,
                BoundingBox::new(rect.x, rect.y, rect.x + rect.width, rect.y + rect.height),
            ));
        }
        Ok(detections)
    }
}

impl Detector<CvFrame> for YoloDetector {
    fn detect(&mut self, frame: &CvFrame) -> Result<Vec<Detection>, DetectorError> {
        self.infer(&frame.0).map_err(detector_error)
    }
}

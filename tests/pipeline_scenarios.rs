use crash_vision::ingest::SyntheticSource;
use crash_vision::{
    open_source, ChannelOrder, ClassifierOutput, ColorName, Frame, FrameResult, FrameSource,
    IncidentPipeline, JsonLinesSink, PipelineError, PixelBox, RawCandidate, ResultSink,
    ScriptedClassifier, ScriptedDetector, SeverityLevel, SourceConfig,
};

fn quiet_scores() -> ClassifierOutput {
    ClassifierOutput::new(vec![0.9, 0.05, 0.03, 0.02], vec![0.1, 0.9])
}

fn incident_scores() -> ClassifierOutput {
    ClassifierOutput::new(vec![0.1, 0.1, 0.7, 0.1], vec![0.1, 0.85])
}

/// 640x480 BGR capture with a blue car in the middle.
fn street_frame() -> Frame {
    let mut frame = Frame::filled(640, 480, ChannelOrder::Bgr, [70, 70, 70]);
    frame.fill_rect(PixelBox::new(240, 180, 160, 120), [10, 20, 220]);
    frame
}

fn car_candidate() -> RawCandidate {
    RawCandidate::one_hot(0.5, 0.5, 0.25, 0.25, 2, 0.95, 80)
}

#[test]
fn quiet_frame_never_reaches_the_detector() {
    // Accident head is confident, but the severity argmax is "none".
    let scores = ClassifierOutput::new(vec![0.9, 0.05, 0.03, 0.02], vec![0.1, 0.9]);
    let mut pipeline = IncidentPipeline::new(
        ScriptedClassifier::fixed(scores),
        ScriptedDetector::new(vec![car_candidate()]),
    );

    let result = pipeline.process(&street_frame()).expect("process frame");

    assert!(!result.incident_detected);
    assert_eq!(result.severity, SeverityLevel::None);
    assert!(result.detections.is_empty());
    assert_eq!(result.headline(), "No Accident Detected");
    assert_eq!(pipeline.detector().invocations(), 0);
}

#[test]
fn incident_frame_is_localized_and_colored() {
    let mut pipeline = IncidentPipeline::new(
        ScriptedClassifier::fixed(incident_scores()),
        ScriptedDetector::new(vec![car_candidate()]),
    );

    let result = pipeline.process(&street_frame()).expect("process frame");

    assert!(result.incident_detected);
    assert_eq!(result.severity, SeverityLevel::Medium);
    assert_eq!(result.accident_confidence, 0.85);
    assert_eq!(result.headline(), "Accident Severity: 2 (Confidence: 0.85)");
    assert_eq!(pipeline.detector().invocations(), 1);

    assert_eq!(result.detections.len(), 1);
    let vehicle = &result.detections[0];
    assert_eq!(vehicle.vehicle_type, "car");
    assert_eq!(vehicle.detection.bbox, PixelBox::new(240, 180, 160, 120));
    assert_eq!(vehicle.detection.confidence, 0.95);
    assert_eq!(vehicle.color.name, ColorName::Blue);
    assert_eq!(vehicle.caption(), "car (Blue)");
}

#[test]
fn same_frame_same_result() {
    let frame = street_frame();
    let build = || {
        IncidentPipeline::new(
            ScriptedClassifier::fixed(incident_scores()),
            ScriptedDetector::new(vec![
                car_candidate(),
                RawCandidate::one_hot(0.52, 0.5, 0.25, 0.25, 7, 0.8, 80),
                RawCandidate::one_hot(0.1, 0.1, 0.1, 0.1, 5, 0.9, 80),
            ]),
        )
    };

    let mut first = build();
    let a = first.process(&frame).expect("first run");
    let b = first.process(&frame).expect("second run");
    let c = build().process(&frame).expect("fresh pipeline");

    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.digest(), c.digest());
    // The overlapping truck box is suppressed by the car.
    assert_eq!(a.detections.len(), 2);
    assert_eq!(a.detections[0].vehicle_type, "car");
    assert_eq!(a.detections[1].vehicle_type, "bus");
}

#[test]
fn malformed_classifier_output_is_a_shape_error() {
    let bad = ClassifierOutput::new(vec![0.2, 0.3, 0.5], vec![0.1, 0.9]);
    let mut pipeline =
        IncidentPipeline::new(ScriptedClassifier::fixed(bad), ScriptedDetector::empty());

    match pipeline.process(&street_frame()) {
        Err(PipelineError::ModelOutputShape { output, .. }) => assert_eq!(output, "severity"),
        other => panic!("expected a shape error, got {:?}", other),
    }
    assert_eq!(pipeline.detector().invocations(), 0);
}

#[test]
fn detector_rows_without_scores_are_a_shape_error() {
    let mut pipeline = IncidentPipeline::new(
        ScriptedClassifier::fixed(incident_scores()),
        ScriptedDetector::new(vec![RawCandidate::new(0.5, 0.5, 0.2, 0.2, Vec::new())]),
    );

    let err = pipeline.process(&street_frame()).unwrap_err();
    assert!(matches!(err, PipelineError::ModelOutputShape { .. }));
    assert_eq!(pipeline.process_or_degrade(&street_frame()), FrameResult::degraded());
}

#[test]
fn malformed_frames_are_invalid() {
    assert!(Frame::from_interleaved(vec![0; 10], 2, 2, 3, ChannelOrder::Bgr)
        .unwrap_err()
        .is_invalid_frame());
    assert!(Frame::from_interleaved(vec![0; 16], 2, 2, 4, ChannelOrder::Bgr)
        .unwrap_err()
        .is_invalid_frame());

    let mut pipeline = IncidentPipeline::new(
        ScriptedClassifier::fixed(incident_scores()),
        ScriptedDetector::new(vec![car_candidate()]),
    );
    let empty = Frame::new(Vec::new(), 0, 480, ChannelOrder::Bgr).expect("zero-area frame");
    assert!(pipeline.process(&empty).unwrap_err().is_invalid_frame());

    // The stream carries on with the next frame.
    assert!(pipeline.process(&street_frame()).expect("next frame").incident_detected);
}

#[test]
fn synthetic_stream_end_to_end() {
    let mut source = open_source(&SourceConfig {
        uri: "stub://road".to_string(),
        seed: 3,
    })
    .expect("open source");
    source.connect().expect("connect");

    let vehicle = SyntheticSource::vehicle_box();
    let mut pipeline = IncidentPipeline::new(
        ScriptedClassifier::new(vec![quiet_scores(), quiet_scores(), incident_scores()]),
        ScriptedDetector::new(vec![RawCandidate::one_hot(
            0.5,
            0.5,
            0.25,
            1.0 / 6.0,
            2,
            0.95,
            80,
        )]),
    );
    let mut sink = JsonLinesSink::new(Vec::new());

    for index in 0..6 {
        let frame = source.next_frame().expect("capture").expect("frame");
        let result = pipeline.process(&frame).expect("process");
        sink.render(index, &result).expect("render");

        if index % 3 == 2 {
            assert!(result.incident_detected);
            assert_eq!(result.detections.len(), 1);
            assert_eq!(result.detections[0].detection.bbox, vehicle);
            assert_eq!(result.detections[0].color.name, ColorName::Red);
        } else {
            assert!(!result.incident_detected);
        }
    }

    let stats = pipeline.stats();
    assert_eq!(stats.frames_processed, 6);
    assert_eq!(stats.incidents, 2);
    assert_eq!(stats.detector_runs, 2);
    assert_eq!(source.stats().frames_captured, 6);
    assert_eq!(sink.lines_written(), 6);
}

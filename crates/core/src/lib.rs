pub mod anonymization {
    pub mod domain {
        pub mod face_anonymizer;
    }
    pub mod infrastructure {
        pub mod http_face_anonymizer;
    }
}

pub mod blurring {
    pub mod domain {
        pub mod region_blurrer;
    }
    pub mod infrastructure;
}

pub mod classification {
    pub mod domain {
        pub mod face_classifier;
    }
    pub mod infrastructure {
        pub mod http_face_classifier;
    }
}

pub mod codec {
    pub mod domain {
        pub mod image_codec;
    }
    pub mod infrastructure {
        pub mod jpeg_image_codec;
    }
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure {
        pub mod http_face_detector;
    }
}

pub mod pipeline {
    pub mod anonymize_minors_use_case;
    pub mod pipeline_config;
    pub mod pipeline_error;
    pub mod pipeline_logger;
    pub mod region_outcome;
    pub mod infrastructure {
        pub mod http_pipeline_factory;
        pub mod threaded_region_executor;
    }
}

pub mod shared {
    pub mod collaborator_error;
    pub mod constants;
    pub mod http_transport;
    pub mod raster_image;
    pub mod region;
}

#[cfg(test)]
pub(crate) mod test_support;

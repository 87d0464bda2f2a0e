use burn::{
    prelude::*,
    tensor::{backend::Backend, TensorData},
};

pub trait BoolToTensor<B: Backend> {
    fn to_bool_tensor(self, device: &B::Device) -> Tensor<B, 1, Bool>;

    /// `1.0` where the flag is set, `0.0` elsewhere
    fn to_float_mask(self, device: &B::Device) -> Tensor<B, 1>
    where
        Self: Sized,
    {
        self.to_bool_tensor(device).float()
    }
}

impl<B: Backend> BoolToTensor<B> for Vec<bool> {
    fn to_bool_tensor(self, device: &B::Device) -> Tensor<B, 1, Bool> {
        let len = self.len();
        let int_data: Vec<i32> = self.into_iter().map(i32::from).collect();
        let int_tensor: Tensor<B, 1, Int> =
            Tensor::from_data(TensorData::new(int_data, [len]), device);
        int_tensor.greater_elem(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn done_flags_become_float_mask() {
        let device = NdArrayDevice::default();
        let mask: Tensor<NdArray, 1> = vec![true, false, true].to_float_mask(&device);

        let values: Vec<f32> = mask.into_data().iter::<f32>().collect();
        assert_eq!(values, vec![1.0, 0.0, 1.0]);
    }
}
